//! # Wharf Storage
//!
//! Crash-safe persistence for reconnect credentials.

pub mod error;
pub mod saved_connections;

pub use error::StorageError;
pub use saved_connections::{SavedConnections, SqliteSavedConnections};
