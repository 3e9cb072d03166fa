//! Tracing subscriber setup

use anima_core::{AnimaError, AnimaResult};
use tracing_subscriber::EnvFilter;

use crate::LoggingConfig;

/// `RUST_LOG` when set, otherwise the configured directive
pub fn env_filter(cfg: &LoggingConfig) -> AnimaResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .map_err(|e| AnimaError::InvalidConfig(format!("logging.filter: {e}")))
}

/// Install the global subscriber; fails if one is already set
pub fn init_logging(cfg: &LoggingConfig) -> AnimaResult<()> {
    let filter = env_filter(cfg)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AnimaError::InvalidConfig(format!("logging: {e}")))
}
