//! The browser/downloader-facing half of a transfer: a thin wrapper around
//! one client's WebSocket used for exactly one protocol exchange at a time.
//!
//! Unlike [`crate::host_conn::HostConn`] there is no multiplexing here — a
//! `ClientConn` is only ever driven by the single orchestrator task running
//! that client's protocol, so `send`/`listen` take `&mut self` and are
//! never called concurrently on the same connection (spec §4.C).
//!
//! Grounded in
//! `original_source/.../infrastructure/client/clientconn/clientconn.go`'s
//! `Send`/`Listen`/`Close`, adapted to axum's `WebSocket`, which already
//! normalizes a clean remote close into a `Message::Close` item rather than
//! a distinct error per close code the way gorilla/websocket does — so the
//! close-code table collapses to the same three-way taxonomy with less
//! manual mapping on this side.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;

use crate::error::ClientConnError;

/// Narrow view of [`ClientConn`] that `wharf-orchestrator` depends on, so
/// its protocol tests can drive a fake client instead of a real WebSocket.
#[async_trait]
pub trait ClientConnLike: Send + Sync {
    async fn send(&mut self, parts: &[&[u8]]) -> Result<(), ClientConnError>;
    async fn send_and_log_error(&mut self, parts: &[&[u8]]);
    async fn listen(&mut self) -> Result<Bytes, ClientConnError>;
    async fn close(&mut self);
}

#[async_trait]
impl ClientConnLike for ClientConn {
    async fn send(&mut self, parts: &[&[u8]]) -> Result<(), ClientConnError> {
        ClientConn::send(self, parts).await
    }

    async fn send_and_log_error(&mut self, parts: &[&[u8]]) {
        ClientConn::send_and_log_error(self, parts).await
    }

    async fn listen(&mut self) -> Result<Bytes, ClientConnError> {
        ClientConn::listen(self).await
    }

    async fn close(&mut self) {
        ClientConn::close(self).await
    }
}

/// One client's WebSocket, with a single read/write deadline applied to
/// every `send`/`listen` call.
pub struct ClientConn {
    ws: WebSocket,
    timeout: Duration,
}

impl ClientConn {
    pub fn new(ws: WebSocket, timeout: Duration) -> Self {
        Self { ws, timeout }
    }

    /// Sends `parts` (concatenated) as one binary frame.
    pub async fn send(&mut self, parts: &[&[u8]]) -> Result<(), ClientConnError> {
        let mut frame = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            frame.extend_from_slice(part);
        }
        match tokio::time::timeout(self.timeout, self.ws.send(Message::Binary(frame.into()))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                let _ = self.ws.close().await;
                Err(ClientConnError::Other { context: "client write failed", reason: err.to_string() })
            }
            Err(_elapsed) => {
                let _ = self.ws.close().await;
                Err(ClientConnError::Timeout)
            }
        }
    }

    /// `send`, logging (rather than propagating) any failure — used where
    /// the caller has nothing further to do with the connection regardless
    /// of outcome, e.g. relaying a terminal error frame.
    pub async fn send_and_log_error(&mut self, parts: &[&[u8]]) {
        if let Err(err) = self.send(parts).await {
            tracing::warn!(error = %err, "failed to deliver frame to client");
        }
    }

    /// Waits for the next binary frame from the client.
    pub async fn listen(&mut self) -> Result<Bytes, ClientConnError> {
        match tokio::time::timeout(self.timeout, self.ws.recv()).await {
            Ok(Some(Ok(Message::Binary(data)))) => Ok(data),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => Err(ClientConnError::ConnectionClosed),
            Ok(Some(Ok(_))) => Err(ClientConnError::Other {
                context: "unexpected frame type",
                reason: "expected a binary frame".to_string(),
            }),
            Ok(Some(Err(err))) => Err(ClientConnError::Other { context: "client read failed", reason: err.to_string() }),
            Err(_elapsed) => Err(ClientConnError::Timeout),
        }
    }

    pub async fn close(&mut self) {
        let _ = self.ws.close().await;
    }
}
