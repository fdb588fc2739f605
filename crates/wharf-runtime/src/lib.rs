//! # Wharf Runtime
//!
//! Env-based configuration, tracing setup, and startup wiring for the
//! `wharf` binary — the ambient stack spec.md treats as external
//! collaborators (SPEC_FULL §1).

pub mod config;
pub mod logging;
pub mod storage_setup;

pub use config::{ConfigError, WharfConfig};
pub use logging::LoggingBuilder;
pub use storage_setup::{StorageSetupError, build_saved_connections};
