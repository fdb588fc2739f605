//! Error taxonomy shared across the wharf workspace.
//!
//! Every crate in the workspace defines its own `thiserror` error enum for
//! its own boundary (see `wharf-transport::HostConnError`,
//! `wharf-registry::HostMapError`, and so on), following the layered shape
//! `alloy-core::error` uses (`TransportError` → `AdapterError` →
//! `ApiError`). [`ErrorKind`] is the one taxonomy all of those layers agree
//! to collapse into at the wire boundary — it is the thing that actually
//! gets serialized into an `[Error][code]` frame.

use thiserror::Error;

/// Errors the wire codec itself can raise while framing or parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Frame shorter than the 2-byte message-type header.
    #[error("frame too short to contain a message type")]
    FrameTooShort,

    /// Frame shorter than the message-type + 4-byte stream id it claims to carry.
    #[error("frame too short to contain a stream id")]
    StreamIdTooShort,

    /// `msgType` value has no known variant.
    #[error("unknown message type {0}")]
    UnknownMsgType(u16),

    /// A path or other "string" field was not NUL-terminated before the frame ended.
    #[error("missing NUL terminator")]
    MissingTerminator,

    /// A path contained an embedded NUL byte, making the terminator ambiguous.
    ///
    /// Open Question 3 (spec §9) is resolved here: embedded NULs are
    /// rejected rather than silently truncated at the first occurrence.
    #[error("path contains an embedded NUL byte")]
    EmbeddedNul,

    /// Payload was not valid UTF-8 where a string was expected.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// The error taxonomy from spec §7 — the kinds every crate boundary error
/// ultimately collapses into, and the only vocabulary the wire `Error`
/// frame (type 0) speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unknown,
    ConnectionClosed,
    Timeout,
    HostNotFound,
    HostAlreadyConnected,
    InvalidHostKey,
    InvalidUrlParams,
    MissingRequiredParams,
    InvalidMessageBody,
    UnexpectedMessageType,
    InvalidUploadType,
}

impl ErrorKind {
    /// The `u16` body of an `[Error]` frame for this kind (spec §6).
    pub const fn wire_code(self) -> u16 {
        match self {
            ErrorKind::Unknown => 0,
            ErrorKind::ConnectionClosed => 1,
            ErrorKind::Timeout => 2,
            ErrorKind::HostNotFound => 3,
            ErrorKind::InvalidUrlParams => 4,
            ErrorKind::InvalidMessageBody => 5,
            ErrorKind::UnexpectedMessageType => 6,
            // Implementation-defined codes continue past the spec's explicit
            // six; stable as long as this process is, which is all the wire
            // contract requires (no persistence of error codes across
            // restarts).
            ErrorKind::MissingRequiredParams => 7,
            ErrorKind::HostAlreadyConnected => 8,
            ErrorKind::InvalidHostKey => 9,
            ErrorKind::InvalidUploadType => 10,
        }
    }

    /// Serializes this kind as a full `[Error][code]` frame: message type 0
    /// followed by the two-byte error code.
    pub fn to_frame(self) -> [u8; 4] {
        let mut frame = [0u8; 4];
        frame[0..2].copy_from_slice(&crate::codec::write_u16(0)); // MsgType::Error
        frame[2..4].copy_from_slice(&crate::codec::write_u16(self.wire_code()));
        frame
    }
}

impl From<CodecError> for ErrorKind {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::FrameTooShort
            | CodecError::StreamIdTooShort
            | CodecError::MissingTerminator
            | CodecError::InvalidUtf8
            | CodecError::EmbeddedNul
            | CodecError::UnknownMsgType(_) => ErrorKind::InvalidMessageBody,
        }
    }
}
