//! # Wharf Orchestrator
//!
//! The six file-transfer protocols (spec §4.F), composed from
//! `wharf-registry`'s [`wharf_registry::HostMap`] and
//! `wharf-storage`'s [`wharf_storage::SavedConnections`].

pub mod error;
pub mod protocols;

pub use error::OrchestratorError;
pub use protocols::{Orchestrator, OrchestratorConfig};
