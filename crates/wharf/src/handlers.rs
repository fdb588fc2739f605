//! One handler per endpoint in spec.md §6's table. Every handler upgrades
//! the socket unconditionally, then validates; a validation failure is
//! delivered as an `Error` frame over the now-upgraded socket rather than
//! a plain HTTP 400 — SPEC_FULL §6, grounded in
//! `original_source/.../controllers/host/controller.go`.

use std::collections::HashMap;

use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::extract::ws::WebSocket;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use wharf_core::ErrorKind;
use wharf_transport::ClientConn;

use crate::params::{parse_resource_path, parse_upload_params, required_query};
use crate::state::AppState;

fn upgrade(ws: WebSocketUpgrade, batch_size: usize) -> WebSocketUpgrade {
    ws.read_buffer_size(batch_size).write_buffer_size(batch_size)
}

/// Writes a bare `[Error][code]` frame directly to a not-yet-wrapped
/// socket and closes it — used by protocols 1/2, which have no `ClientConn`
/// of their own (the socket *is* the host connection being rejected).
async fn reject_raw(mut ws: WebSocket, kind: ErrorKind) {
    use axum::extract::ws::Message;
    use futures::SinkExt;
    let _ = ws.send(Message::Binary(kind.to_frame().to_vec().into())).await;
    let _ = ws.close().await;
}

/// Protocol 1 — GET /api/v1/host/connect
pub async fn connect(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let ws = upgrade(ws, state.batch_size);
    ws.on_upgrade(move |socket| async move {
        if let Err(err) = state.orchestrator.connect_ws(socket).await {
            tracing::warn!(error = %err, "host connect failed");
        }
    })
}

/// Protocol 2 — GET /api/v1/host/reconnect/{hostId}?hostKey={key}
pub async fn reconnect(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(host_id_raw): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let ws = upgrade(ws, state.batch_size);

    let host_id = host_id_raw.parse();
    let host_key = required_query(&query, "hostKey").map(str::to_string);

    ws.on_upgrade(move |socket| async move {
        let host_id = match host_id {
            Ok(id) => id,
            Err(_) => return reject_raw(socket, ErrorKind::InvalidUrlParams).await,
        };
        let host_key = match host_key {
            Ok(key) => key,
            Err(kind) => return reject_raw(socket, kind).await,
        };

        if let Err(err) = state.orchestrator.reconnect_ws(socket, host_id, &host_key).await {
            tracing::warn!(%host_id, error = %err, "host reconnect failed");
        }
    })
}

/// Protocol 3 — GET /api/v1/host/metadata/{hostId}/{resourceId}/{path...}
pub async fn metadata(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw, path_raw)): Path<(String, String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, path_raw, Orchestration::Metadata)
}

/// GET /api/v1/host/metadata/{hostId}/{resourceId} (empty resource path).
pub async fn metadata_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw)): Path<(String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, String::new(), Orchestration::Metadata)
}

/// Protocol 6a — GET /api/v1/host/directory/create/{hostId}/{resourceId}/{path...}
pub async fn create_directory(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw, path_raw)): Path<(String, String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, path_raw, Orchestration::CreateDirectory)
}

pub async fn create_directory_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw)): Path<(String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, String::new(), Orchestration::CreateDirectory)
}

/// Protocol 6b — GET /api/v1/host/resource/delete/{hostId}/{resourceId}/{path...}
pub async fn delete_resource(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw, path_raw)): Path<(String, String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, path_raw, Orchestration::DeleteResource)
}

pub async fn delete_resource_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw)): Path<(String, String)>,
) -> impl IntoResponse {
    run_simple_exchange(ws, state, host_id_raw, resource_id_raw, String::new(), Orchestration::DeleteResource)
}

/// Protocol 4 — GET /api/v1/host/download/{hostId}/{resourceId}/{path...}
pub async fn download(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw, path_raw)): Path<(String, String, String)>,
) -> impl IntoResponse {
    run_download(ws, state, host_id_raw, resource_id_raw, path_raw)
}

pub async fn download_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw)): Path<(String, String)>,
) -> impl IntoResponse {
    run_download(ws, state, host_id_raw, resource_id_raw, String::new())
}

/// Protocol 5 — GET /api/v1/host/upload/{hostId}/{resourceId}/{path...}?name=...&type=file&uploadFileSize=...
pub async fn upload(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw, path_raw)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    run_upload(ws, state, host_id_raw, resource_id_raw, path_raw, query)
}

pub async fn upload_root(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((host_id_raw, resource_id_raw)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    run_upload(ws, state, host_id_raw, resource_id_raw, String::new(), query)
}

/// GET /api/v1/ping
pub async fn ping() -> impl IntoResponse {
    #[derive(Serialize)]
    struct Pong {
        message: &'static str,
    }
    Json(Pong { message: "Pong :)" })
}

/// GET /api/v1/config — non-secret subset a web client needs.
pub async fn config(State(state): State<AppState>) -> impl IntoResponse {
    #[derive(Serialize)]
    struct FrontendConfig {
        batch_size: usize,
    }
    Json(FrontendConfig { batch_size: state.batch_size })
}

/// The three single-exchange protocols differ only in the `MsgType` they
/// send the host, so their handlers share everything but that choice.
enum Orchestration {
    Metadata,
    CreateDirectory,
    DeleteResource,
}

fn run_simple_exchange(
    ws: WebSocketUpgrade,
    state: AppState,
    host_id_raw: String,
    resource_id_raw: String,
    path_raw: String,
    op: Orchestration,
) -> axum::response::Response {
    let ws = upgrade(ws, state.batch_size);
    ws.on_upgrade(move |socket| async move {
        let mut client = ClientConn::new(socket, state.client_io_timeout);
        let (host_id, resource_id, path) = match parse_resource_path(&host_id_raw, &resource_id_raw, &path_raw) {
            Ok(parsed) => parsed,
            Err(kind) => {
                client.send_and_log_error(&[&kind.to_frame()]).await;
                client.close().await;
                return;
            }
        };

        let result = match op {
            Orchestration::Metadata => {
                state.orchestrator.get_metadata(&mut client, host_id, resource_id, &path).await
            }
            Orchestration::CreateDirectory => {
                state.orchestrator.create_directory(&mut client, host_id, resource_id, &path).await
            }
            Orchestration::DeleteResource => {
                state.orchestrator.delete_resource(&mut client, host_id, resource_id, &path).await
            }
        };
        if let Err(err) = result {
            tracing::warn!(%host_id, %resource_id, error = %err, "protocol failed");
        }
    })
    .into_response()
}

fn run_download(
    ws: WebSocketUpgrade,
    state: AppState,
    host_id_raw: String,
    resource_id_raw: String,
    path_raw: String,
) -> axum::response::Response {
    let ws = upgrade(ws, state.batch_size);
    ws.on_upgrade(move |socket| async move {
        let mut client = ClientConn::new(socket, state.client_io_timeout);
        let (host_id, resource_id, path) = match parse_resource_path(&host_id_raw, &resource_id_raw, &path_raw) {
            Ok(parsed) => parsed,
            Err(kind) => {
                client.send_and_log_error(&[&kind.to_frame()]).await;
                client.close().await;
                return;
            }
        };

        if let Err(err) = state.orchestrator.download(&mut client, host_id, resource_id, &path).await {
            tracing::warn!(%host_id, %resource_id, error = %err, "download failed");
        }
    })
    .into_response()
}

fn run_upload(
    ws: WebSocketUpgrade,
    state: AppState,
    host_id_raw: String,
    resource_id_raw: String,
    path_raw: String,
    query: HashMap<String, String>,
) -> axum::response::Response {
    let ws = upgrade(ws, state.batch_size);
    ws.on_upgrade(move |socket| async move {
        let mut client = ClientConn::new(socket, state.client_io_timeout);
        let (host_id, resource_id, path) = match parse_resource_path(&host_id_raw, &resource_id_raw, &path_raw) {
            Ok(parsed) => parsed,
            Err(kind) => {
                client.send_and_log_error(&[&kind.to_frame()]).await;
                client.close().await;
                return;
            }
        };
        let file_size = match parse_upload_params(&query) {
            Ok(size) => size,
            Err(kind) => {
                client.send_and_log_error(&[&kind.to_frame()]).await;
                client.close().await;
                return;
            }
        };

        if let Err(err) =
            state.orchestrator.create_file(&mut client, host_id, resource_id, &path, file_size).await
        {
            tracing::warn!(%host_id, %resource_id, error = %err, "upload failed");
        }
    })
    .into_response()
}
