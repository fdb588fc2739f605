use thiserror::Error;
use wharf_core::{ErrorKind, HostId};

#[derive(Debug, Clone, Error)]
pub enum HostMapError {
    /// `AddExisting` / a reconnect attempt named a host id that is already
    /// live — spec §4.D, reconnect protocol step 3.
    #[error("host {0} is already connected")]
    AlreadyConnected(HostId),

    /// Lookup by id found nothing — spec §4.D, `Get`.
    #[error("host {0} not found")]
    NotFound(HostId),
}

impl HostMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HostMapError::AlreadyConnected(_) => ErrorKind::HostAlreadyConnected,
            HostMapError::NotFound(_) => ErrorKind::HostNotFound,
        }
    }
}
