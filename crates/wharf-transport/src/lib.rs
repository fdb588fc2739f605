//! # Wharf Transport
//!
//! The two connection wrappers the relay server is built on: [`HostConn`],
//! a query/response multiplexer over a host's WebSocket, and [`ClientConn`],
//! a single-exchange wrapper over a client's.

pub mod client_conn;
pub mod error;
pub mod host_conn;

pub use client_conn::{ClientConn, ClientConnLike};
pub use error::{ClientConnError, HostConnError};
pub use host_conn::{DEFAULT_QUERY_TIMEOUT, HostConn, HostHandle};
