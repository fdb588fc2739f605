use std::sync::Arc;
use std::time::Duration;

use wharf_orchestrator::Orchestrator;
use wharf_registry::HostMap;

/// Shared state handed to every handler — grounded in
/// `alloy-transport/src/websocket/server.rs`'s `ServerState` (`Arc`-wrapped,
/// `.with_state(state.clone())`).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub hosts: Arc<HostMap>,
    pub batch_size: usize,
    pub client_io_timeout: Duration,
}
