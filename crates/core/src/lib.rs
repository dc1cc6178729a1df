pub mod catalog;
pub mod config;
pub mod confirmation;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod outcome;
pub mod telemetry;

pub use catalog::{CatalogError, LatencyClass, ToolCatalog, ToolDescriptor};
pub use confirmation::ConfirmationSet;
pub use domain::buyer::{Buyer, BuyerId};
pub use domain::deal::{Deal, DealId, DealStage};
pub use domain::transcript::{TranscriptHit, TranscriptId};
pub use errors::{StoreError, ToolError};
pub use intent::{PageContext, RequestCategory, ResponseTier, RouterVerdict};
pub use outcome::ToolOutcome;
