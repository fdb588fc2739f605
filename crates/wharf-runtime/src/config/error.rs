//! Configuration error types — spec §6's "all required; absence is a
//! fatal startup error", mirrored from `alloy-runtime::config::error::ConfigError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Extraction/deserialization failed — usually a missing or
    /// non-numeric env var. `figment::Error`'s own `Display` already names
    /// the offending key, so it's carried through unwrapped.
    #[error(transparent)]
    Extract(#[from] figment::Error),

    #[error("DATABASE_DRIVER {0:?} is not supported (only \"sqlite\" is implemented)")]
    UnsupportedDatabaseDriver(String),

    #[error("SAVED_CONNECTIONS_VALID_FOR_DAYS must be positive, got {0}")]
    NonPositiveValidForDays(i64),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
