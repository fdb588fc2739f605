//! Exercises `HostConn::spawn`'s reader/writer tasks against a real
//! WebSocket, not just the pure `route_response` helper the in-module unit
//! tests cover. Grounded in `clawde-io-apps/daemon/tests/integration_test.rs`'s
//! technique (a real `TcpListener` plus a `tokio_tungstenite` client) and in
//! the teacher's own `websocket/client.rs` for the `connect_async`/
//! `tungstenite::Message`/`SinkExt::close()` idiom.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wharf_core::HostId;
use wharf_transport::{HostConn, HostConnError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone)]
struct AppState {
    eviction_tx: mpsc::UnboundedSender<HostId>,
    conn_tx: mpsc::UnboundedSender<Arc<HostConn>>,
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let conn = HostConn::spawn(socket, HostId::new_v4(), state.eviction_tx.clone());
        let _ = state.conn_tx.send(conn);
    })
}

/// Binds a one-route axum server on a random loopback port and hands back
/// its URL plus a channel that yields the server-side `HostConn` the moment
/// a client upgrades.
async fn start_server(eviction_tx: mpsc::UnboundedSender<HostId>) -> (String, mpsc::UnboundedReceiver<Arc<HostConn>>) {
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/host", get(upgrade)).with_state(AppState { eviction_tx, conn_tx });

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind loopback listener");
    let addr = listener.local_addr().expect("listener has no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });

    (format!("ws://{addr}/host"), conn_rx)
}

async fn recv_binary(client: &mut WsStream) -> Vec<u8> {
    loop {
        match client.next().await.expect("client stream ended").expect("client read failed") {
            Message::Binary(data) => return data.to_vec(),
            _ => continue,
        }
    }
}

// Invariant 1 — concurrent Query routing: two in-flight queries are answered
// out of order and each still resolves to its own caller.
#[tokio::test]
async fn concurrent_queries_are_routed_back_to_the_right_waiter() {
    let (eviction_tx, _eviction_rx) = mpsc::unbounded_channel();
    let (url, mut conn_rx) = start_server(eviction_tx).await;

    let (mut client, _) = connect_async(&url).await.expect("client connect failed");
    let conn = conn_rx.recv().await.expect("server never registered a HostConn");

    let task_a = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.query(&[b"payload-a"]).await })
    };
    let task_b = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.query(&[b"payload-b"]).await })
    };

    let frame_1 = recv_binary(&mut client).await;
    let frame_2 = recv_binary(&mut client).await;

    // Answer whichever payload we saw, regardless of arrival order, to prove
    // routing is by query-id rather than response order.
    for frame in [&frame_1, &frame_2] {
        let query_id = &frame[..4];
        let payload = &frame[4..];
        let reply_body: &[u8] = if payload == b"payload-a" { b"reply-a" } else { b"reply-b" };
        let mut reply = query_id.to_vec();
        reply.extend_from_slice(reply_body);
        client.send(Message::Binary(reply.into())).await.expect("client send failed");
    }

    let result_a = task_a.await.unwrap().expect("query a failed");
    let result_b = task_b.await.unwrap().expect("query b failed");
    assert_eq!(result_a, Bytes::from_static(b"reply-a"));
    assert_eq!(result_b, Bytes::from_static(b"reply-b"));
}

// Invariant 2 — idempotent Close: calling close() twice only ever fires the
// eviction notice once.
#[tokio::test]
async fn close_is_idempotent_and_evicts_exactly_once() {
    let (eviction_tx, mut eviction_rx) = mpsc::unbounded_channel();
    let (url, mut conn_rx) = start_server(eviction_tx).await;

    let (_client, _) = connect_async(&url).await.expect("client connect failed");
    let conn = conn_rx.recv().await.expect("server never registered a HostConn");

    conn.close();
    conn.close();

    assert_eq!(eviction_rx.recv().await, Some(conn.host_id()));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), eviction_rx.recv()).await.is_err(),
        "close() fired the eviction notice more than once"
    );
}

// Termination trigger 4 (spec §4.B): a clean Close frame from the remote end
// unblocks every query in flight and still drives the connection through
// close_with_error exactly once.
#[tokio::test]
async fn a_clean_close_frame_from_the_peer_unblocks_pending_queries() {
    let (eviction_tx, mut eviction_rx) = mpsc::unbounded_channel();
    let (url, mut conn_rx) = start_server(eviction_tx).await;

    let (mut client, _) = connect_async(&url).await.expect("client connect failed");
    let conn = conn_rx.recv().await.expect("server never registered a HostConn");

    let waiter = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.query(&[b"doomed"]).await })
    };
    let _ = recv_binary(&mut client).await;

    client.close(None).await.expect("client close failed");

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(HostConnError::ConnectionClosed)));
    assert_eq!(eviction_rx.recv().await, Some(conn.host_id()));
}
