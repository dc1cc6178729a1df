//! Tracing initialization driven by [`LoggingConfig`].

use tracing::Level;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber. Safe to call more than once; later
/// calls are ignored so tests can initialize freely.
pub fn init_tracing(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().try_init()
        }
    };

    let _ = result;
}
