//! Thread-safe registry of connected hosts, keyed by [`HostId`].
//!
//! Grounded in `original_source/.../infrastructure/host/hostmap/hostmap.go`
//! (`AddNew`/`AddExisting`/`Remove`/`Get`, the unique-id generation loop
//! held across a single write lock, and the onClose-callback removal path)
//! and in `alloy-runtime/src/registry.rs`'s `BotRegistry` for the
//! idiomatic Rust shape of that same thing: `Arc<RwLock<HashMap<..>>>`,
//! async accessor methods, and a `Stats` struct with a `Display` impl.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::WebSocket;
use tokio::sync::{RwLock, mpsc};
use wharf_core::HostId;
use wharf_transport::{HostConn, HostHandle};

use crate::error::HostMapError;

type Hosts = Arc<RwLock<HashMap<HostId, Arc<dyn HostHandle>>>>;

/// Owns every live host connection and the background task that drains
/// self-reported evictions (spec §4.D).
pub struct HostMap {
    hosts: Hosts,
    eviction_tx: mpsc::UnboundedSender<HostId>,
}

impl HostMap {
    pub fn new() -> Arc<Self> {
        let (eviction_tx, eviction_rx) = mpsc::unbounded_channel();
        let hosts: Hosts = Arc::new(RwLock::new(HashMap::new()));
        tokio::spawn(drain_evictions(hosts.clone(), eviction_rx));
        Arc::new(Self { hosts, eviction_tx })
    }

    /// Mints a fresh [`HostId`] (rejection-sampled against ids already in
    /// use, matching the Go source's generation loop) and registers a new
    /// [`HostConn`] for `ws` under it.
    pub async fn add_new(&self, ws: WebSocket) -> HostId {
        let mut hosts = self.hosts.write().await;
        let mut id = HostId::new_v4();
        while hosts.contains_key(&id) {
            id = HostId::new_v4();
        }
        let conn = HostConn::spawn(ws, id, self.eviction_tx.clone());
        hosts.insert(id, conn);
        tracing::info!(host_id = %id, "new host connected");
        id
    }

    /// Registers `ws` under a caller-supplied `id` — the reconnect path,
    /// spec §4.D. Fails if `id` is already live.
    pub async fn add_existing(&self, ws: WebSocket, id: HostId) -> Result<(), HostMapError> {
        let mut hosts = self.hosts.write().await;
        if hosts.contains_key(&id) {
            return Err(HostMapError::AlreadyConnected(id));
        }
        let conn = HostConn::spawn(ws, id, self.eviction_tx.clone());
        hosts.insert(id, conn);
        tracing::info!(host_id = %id, "host reconnected");
        Ok(())
    }

    /// Removes and closes a host. Closing an already-closed `HostConn` is a
    /// no-op (its own `close` is idempotent), so this is safe to call
    /// whether or not the host initiated the disconnect.
    pub async fn remove(&self, id: HostId) {
        let removed = self.hosts.write().await.remove(&id);
        if let Some(conn) = removed {
            conn.close();
            tracing::info!(host_id = %id, "host disconnected");
        }
    }

    pub async fn get(&self, id: HostId) -> Option<Arc<dyn HostHandle>> {
        self.hosts.read().await.get(&id).cloned()
    }

    pub async fn stats(&self) -> HostMapStats {
        HostMapStats { connected: self.hosts.read().await.len() }
    }

    #[cfg(test)]
    pub(crate) async fn insert_test_handle(&self, id: HostId, handle: Arc<dyn HostHandle>) {
        self.hosts.write().await.insert(id, handle);
    }
}

/// Drains ids that closed connections report on their own — see spec §4.D
/// on why this is a channel rather than a callback straight into `remove`:
/// `remove` itself calls `close()`, so a callback from inside `close()`
/// back into `remove` would recurse.
async fn drain_evictions(hosts: Hosts, mut rx: mpsc::UnboundedReceiver<HostId>) {
    while let Some(id) = rx.recv().await {
        if hosts.write().await.remove(&id).is_some() {
            tracing::info!(host_id = %id, "host disconnected");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HostMapStats {
    pub connected: usize,
}

impl std::fmt::Display for HostMapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} host(s) connected", self.connected)
    }
}
