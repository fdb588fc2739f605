//! # Wharf Core
//!
//! Shared vocabulary for the wharf file-transfer relay: the binary wire
//! protocol spoken on both the host and client WebSocket, the identifiers
//! that thread through every protocol, and the error taxonomy other crates
//! build on.
//!
//! Wharf itself stores no file content — it routes framed binary messages
//! between a long-lived *host* (owns files on its local storage) and a
//! short-lived *client* (a browser requesting an operation). This crate
//! defines the frame shape both sides agree on.

pub mod codec;
pub mod error;
pub mod ids;
pub mod model;

pub use codec::{MsgType, get_msg_type, get_stream_id, read_nul_terminated, write_nul_terminated};
pub use error::{CodecError, ErrorKind};
pub use ids::{HashString, HostId, HostKey, ResourceId, StreamId};
pub use model::SavedConnection;
