//! The orchestrator's own error enum, wrapping every layer below it via
//! `#[from]` — the top of the layered-error-enum chain described in
//! spec §7 / SPEC_FULL §7 (`CodecError` → `HostConnError`/`ClientConnError`
//! /`HostMapError`/`StorageError` → `OrchestratorError`).

use thiserror::Error;
use wharf_core::ErrorKind;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("host {0} not found")]
    HostNotFound(wharf_core::HostId),

    #[error(transparent)]
    HostMap(#[from] wharf_registry::HostMapError),

    #[error(transparent)]
    HostConn(#[from] wharf_transport::HostConnError),

    #[error(transparent)]
    ClientConn(#[from] wharf_transport::ClientConnError),

    #[error(transparent)]
    Storage(#[from] wharf_storage::StorageError),

    #[error(transparent)]
    Codec(#[from] wharf_core::CodecError),

    /// The host responded with something other than what the protocol step
    /// expected (e.g. not `ACK` after a handshake query) — spec §4.F,
    /// Protocol 1 step 4 / Protocol 2 step 5.
    #[error("unexpected message type from host")]
    UnexpectedMessageType,

    /// Reconnect key did not match the persisted hash — spec §4.F, Protocol
    /// 2 step 3.
    #[error("reconnect key does not match the saved record")]
    InvalidHostKey,

    /// `type` query parameter on the upload endpoint was neither `file` nor
    /// `dir` — spec §9 Open Question 2 (only `file` is implemented; `dir`
    /// is rejected rather than silently accepted).
    #[error("upload type must be \"file\"")]
    InvalidUploadType,
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::HostNotFound(_) => ErrorKind::HostNotFound,
            OrchestratorError::HostMap(e) => e.kind(),
            OrchestratorError::HostConn(e) => e.kind(),
            OrchestratorError::ClientConn(e) => e.kind(),
            OrchestratorError::Storage(e) => e.kind(),
            OrchestratorError::Codec(e) => (*e).clone().into(),
            OrchestratorError::UnexpectedMessageType => ErrorKind::UnexpectedMessageType,
            OrchestratorError::InvalidHostKey => ErrorKind::InvalidHostKey,
            OrchestratorError::InvalidUploadType => ErrorKind::InvalidUploadType,
        }
    }

    /// The `u16` body of the `[Error]` frame the orchestrator sends the
    /// client for this failure — spec §6/§7.
    pub fn to_wire_code(&self) -> u16 {
        self.kind().wire_code()
    }
}
