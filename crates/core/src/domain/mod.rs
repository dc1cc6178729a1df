pub mod buyer;
pub mod deal;
pub mod transcript;
