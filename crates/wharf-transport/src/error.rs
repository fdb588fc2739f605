//! Error types for the two connection wrappers this crate provides.
//!
//! Mirrors the layered shape of `alloy-core::error`
//! (`TransportError` → `AdapterError`): each wrapper gets its own
//! `thiserror` enum, and both carry a `kind()` that collapses into the
//! shared [`wharf_core::ErrorKind`] taxonomy at the point the orchestrator
//! needs to put one on the wire.

use thiserror::Error;
use wharf_core::ErrorKind;

/// Errors a [`crate::host_conn::HostConn`] call can return.
#[derive(Debug, Clone, Error)]
pub enum HostConnError {
    /// The connection was closed (by either end, or cancellation) before or
    /// during this call.
    #[error("host connection closed")]
    ConnectionClosed,

    /// The call's deadline elapsed before a response arrived. The
    /// connection itself is unaffected — spec §4.B, "Timeout semantics".
    #[error("query timed out")]
    Timeout,

    /// The host's response (or an inbound frame generally) violated the
    /// framing contract — spec §4.B, termination trigger 5.
    #[error("invalid message body from host: {0}")]
    InvalidMessageBody(#[from] wharf_core::CodecError),

    /// The writer task failed to deliver a frame to the socket.
    #[error("failed to write to host socket: {0}")]
    WriteFailed(String),
}

impl HostConnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HostConnError::ConnectionClosed => ErrorKind::ConnectionClosed,
            HostConnError::Timeout => ErrorKind::Timeout,
            HostConnError::InvalidMessageBody(_) => ErrorKind::InvalidMessageBody,
            HostConnError::WriteFailed(_) => ErrorKind::Unknown,
        }
    }
}

/// Errors a [`crate::client_conn::ClientConn`] call can return.
///
/// Grounded in
/// `original_source/.../infrastructure/client/clientconn/clientconn.go`'s
/// close-code-to-error mapping: normal closure, going away, abnormal
/// closure, no-status, and policy-violation all normalize to
/// `ConnectionClosed`; a deadline-exceeded read/write normalizes to
/// `Timeout`; anything else is wrapped with a short context prefix.
#[derive(Debug, Clone, Error)]
pub enum ClientConnError {
    #[error("client connection closed")]
    ConnectionClosed,

    #[error("client connection timed out")]
    Timeout,

    #[error("{context}: {reason}")]
    Other { context: &'static str, reason: String },
}

impl ClientConnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientConnError::ConnectionClosed => ErrorKind::ConnectionClosed,
            ClientConnError::Timeout => ErrorKind::Timeout,
            ClientConnError::Other { .. } => ErrorKind::Unknown,
        }
    }
}
