//! The six application protocols (spec §4.F).
//!
//! Every protocol's actual logic lives in a free function taking a
//! `&dyn HostHandle`/`&dyn SavedConnections` (and, where relevant, an
//! `Option<Arc<dyn HostHandle>>` to model "host not currently connected").
//! [`Orchestrator`]'s methods are thin wiring that resolves a `HostId` to a
//! live connection via `HostMap` and hands it to the matching free function.
//! The split exists so the protocol logic can be exercised with fake
//! `HostHandle`/`ClientConnLike` implementations in this module's tests,
//! without a real `HostMap` or WebSocket anywhere in sight — the testing
//! approach spec §8 calls for.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use bytes::Bytes;
use chrono::Utc;
use wharf_core::codec::{MSG_TYPE_SIZE, MsgType, get_msg_type, get_stream_id, write_nul_terminated, write_u32, write_uuid};
use wharf_core::{HashString, HostId, HostKey, ResourceId, SavedConnection};
use wharf_registry::HostMap;
use wharf_storage::SavedConnections;
use wharf_transport::{ClientConnLike, HostHandle};

use crate::error::OrchestratorError;

/// Tunables that do not belong to any one protocol — timeouts and feature
/// flags resolved as configuration in SPEC_FULL §9.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Query timeout used for `ChunkRequest`/`CreateFileHostChunkRequest`
    /// exchanges specifically (Open Question 4).
    pub chunk_query_timeout: Duration,
    /// Whether a reconnect against an id with no saved record is accepted
    /// as a first-time connect rather than rejected (Open Question 1).
    pub allow_reconnect_without_record: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { chunk_query_timeout: Duration::from_secs(120), allow_reconnect_without_record: true }
    }
}

/// Composes `HostMap`, `SavedConnections`, and the per-request `ClientConn`
/// into the six protocols — spec §4.F, table row F.
pub struct Orchestrator {
    hosts: Arc<HostMap>,
    saved_connections: Arc<dyn SavedConnections>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(hosts: Arc<HostMap>, saved_connections: Arc<dyn SavedConnections>, config: OrchestratorConfig) -> Self {
        Self { hosts, saved_connections, config }
    }

    /// Protocol 1 — a brand-new host connects for the first time.
    pub async fn connect_ws(&self, ws: WebSocket) -> Result<HostId, OrchestratorError> {
        let host_id = self.hosts.add_new(ws).await;
        let conn = self.hosts.get(host_id).await.expect("just registered by add_new");

        match connect(conn.as_ref(), host_id, self.saved_connections.as_ref()).await {
            Ok(()) => Ok(host_id),
            Err(err) => {
                conn.close();
                Err(err)
            }
        }
    }

    /// Protocol 2 — a previously-seen host reconnects, presenting the key it
    /// was handed on first connect.
    pub async fn reconnect_ws(&self, ws: WebSocket, host_id: HostId, host_key: &str) -> Result<(), OrchestratorError> {
        if self.hosts.get(host_id).await.is_some() {
            return Err(wharf_registry::HostMapError::AlreadyConnected(host_id).into());
        }

        let presented_hash = HostKey::decode(host_key).ok_or(OrchestratorError::InvalidHostKey)?.hash();
        check_reconnect_key(
            self.saved_connections.as_ref(),
            host_id,
            &presented_hash,
            self.config.allow_reconnect_without_record,
        )
        .await?;

        self.hosts.add_existing(ws, host_id).await?;
        let conn = self.hosts.get(host_id).await.expect("just registered by add_existing");

        match reconnect(conn.as_ref(), host_id, presented_hash, self.saved_connections.as_ref()).await {
            Ok(()) => Ok(()),
            Err(err) => {
                conn.close();
                Err(err)
            }
        }
    }

    /// Protocol 3 — a single metadata query, forwarded verbatim both ways.
    pub async fn get_metadata(
        &self,
        client: &mut dyn ClientConnLike,
        host_id: HostId,
        resource_id: ResourceId,
        path: &str,
    ) -> Result<(), OrchestratorError> {
        let conn = self.hosts.get(host_id).await;
        simple_exchange(conn, client, host_id, MsgType::MetadataQuery, resource_id, path).await
    }

    /// Protocol 6a — create a directory. Same shape as metadata, different
    /// message type.
    pub async fn create_directory(
        &self,
        client: &mut dyn ClientConnLike,
        host_id: HostId,
        resource_id: ResourceId,
        path: &str,
    ) -> Result<(), OrchestratorError> {
        let conn = self.hosts.get(host_id).await;
        simple_exchange(conn, client, host_id, MsgType::CreateDirectory, resource_id, path).await
    }

    /// Protocol 6b — delete a resource. Same shape as metadata, different
    /// message type.
    pub async fn delete_resource(
        &self,
        client: &mut dyn ClientConnLike,
        host_id: HostId,
        resource_id: ResourceId,
        path: &str,
    ) -> Result<(), OrchestratorError> {
        let conn = self.hosts.get(host_id).await;
        simple_exchange(conn, client, host_id, MsgType::DeleteResource, resource_id, path).await
    }

    /// Protocol 4 — a chunked download, the client pulling one chunk at a
    /// time until it signals completion.
    pub async fn download(
        &self,
        client: &mut dyn ClientConnLike,
        host_id: HostId,
        resource_id: ResourceId,
        path: &str,
    ) -> Result<(), OrchestratorError> {
        let conn = self.hosts.get(host_id).await;
        download(conn, client, host_id, resource_id, path, self.config.chunk_query_timeout).await
    }

    /// Protocol 5 — a chunked upload, the host pulling one chunk at a time
    /// via the server until it signals completion.
    pub async fn create_file(
        &self,
        client: &mut dyn ClientConnLike,
        host_id: HostId,
        resource_id: ResourceId,
        path: &str,
        file_size: u32,
    ) -> Result<(), OrchestratorError> {
        let conn = self.hosts.get(host_id).await;
        create_file(conn, client, host_id, resource_id, path, file_size).await
    }
}

async fn connect(
    conn: &dyn HostHandle,
    host_id: HostId,
    saved_connections: &dyn SavedConnections,
) -> Result<(), OrchestratorError> {
    let key = HostKey::generate();
    handshake_connect(conn, host_id, &key).await?;

    let record = SavedConnection { id: host_id, key_hash: key.hash(), created_at: Utc::now() };
    saved_connections.add_or_renew(&record).await?;
    Ok(())
}

async fn reconnect(
    conn: &dyn HostHandle,
    host_id: HostId,
    presented_hash: HashString,
    saved_connections: &dyn SavedConnections,
) -> Result<(), OrchestratorError> {
    handshake_reconnect(conn).await?;

    let renewed = SavedConnection { id: host_id, key_hash: presented_hash, created_at: Utc::now() };
    saved_connections.add_or_renew(&renewed).await?;
    Ok(())
}

async fn check_reconnect_key(
    saved_connections: &dyn SavedConnections,
    host_id: HostId,
    presented_hash: &HashString,
    allow_without_record: bool,
) -> Result<(), OrchestratorError> {
    match saved_connections.get_by_id(host_id).await? {
        Some(record) if record.key_hash == *presented_hash => Ok(()),
        Some(_) => Err(OrchestratorError::InvalidHostKey),
        None if allow_without_record => Ok(()),
        None => Err(OrchestratorError::InvalidHostKey),
    }
}

async fn simple_exchange(
    conn: Option<Arc<dyn HostHandle>>,
    client: &mut dyn ClientConnLike,
    host_id: HostId,
    msg_type: MsgType,
    resource_id: ResourceId,
    path: &str,
) -> Result<(), OrchestratorError> {
    let result = match simple_exchange_inner(conn, host_id, msg_type, resource_id, path).await {
        Ok(response) => client.send(&[&response]).await.map_err(OrchestratorError::from),
        Err(err) => Err(fail_client(client, err).await),
    };
    client.close().await;
    result
}

async fn simple_exchange_inner(
    conn: Option<Arc<dyn HostHandle>>,
    host_id: HostId,
    msg_type: MsgType,
    resource_id: ResourceId,
    path: &str,
) -> Result<Bytes, OrchestratorError> {
    let conn = conn.ok_or(OrchestratorError::HostNotFound(host_id))?;
    let path_bytes = write_nul_terminated(path)?;
    let response = conn.query(&[&msg_type.binary(), &write_uuid(resource_id), &path_bytes]).await?;
    Ok(response)
}

async fn download(
    conn: Option<Arc<dyn HostHandle>>,
    client: &mut dyn ClientConnLike,
    host_id: HostId,
    resource_id: ResourceId,
    path: &str,
    chunk_timeout: Duration,
) -> Result<(), OrchestratorError> {
    let result = match download_inner(conn, client, host_id, resource_id, path, chunk_timeout).await {
        Ok(()) => Ok(()),
        Err(err) => Err(fail_client(client, err).await),
    };
    client.close().await;
    result
}

async fn download_inner(
    conn: Option<Arc<dyn HostHandle>>,
    client: &mut dyn ClientConnLike,
    host_id: HostId,
    resource_id: ResourceId,
    path: &str,
    chunk_timeout: Duration,
) -> Result<(), OrchestratorError> {
    let conn = conn.ok_or(OrchestratorError::HostNotFound(host_id))?;
    let path_bytes = write_nul_terminated(path)?;

    let init_response =
        conn.query(&[&MsgType::DownloadInitRequest.binary(), &write_uuid(resource_id), &path_bytes]).await?;

    if get_msg_type(&init_response) == Ok(MsgType::Error) {
        client.send_and_log_error(&[&init_response]).await;
        return Ok(());
    }

    let (stream_id, payload) = get_stream_id(&init_response)?;
    client.send(&[&MsgType::DownloadInitResponse.binary(), payload]).await?;

    loop {
        match download_step(conn.as_ref(), client, stream_id, chunk_timeout).await {
            Ok(true) => {
                send_download_completion(conn.as_ref(), stream_id).await;
                return Ok(());
            }
            Ok(false) => continue,
            Err(err) => {
                send_download_completion(conn.as_ref(), stream_id).await;
                return Err(err);
            }
        }
    }
}

/// Runs one iteration of the download loop body. `Ok(true)` means the
/// client asked to end the stream; `Ok(false)` means keep looping.
async fn download_step(
    conn: &dyn HostHandle,
    client: &mut dyn ClientConnLike,
    stream_id: u32,
    chunk_timeout: Duration,
) -> Result<bool, OrchestratorError> {
    let frame = client.listen().await?;
    let msg_type = get_msg_type(&frame)?;
    match msg_type {
        MsgType::DownloadCompletionRequest => Ok(true),
        MsgType::ChunkRequest => {
            let payload = &frame[MSG_TYPE_SIZE..];
            let response = conn
                .query_with_timeout(chunk_timeout, &[&MsgType::ChunkRequest.binary(), &write_u32(stream_id), payload])
                .await?;
            client.send(&[&response]).await?;
            Ok(false)
        }
        _ => Err(OrchestratorError::UnexpectedMessageType),
    }
}

async fn create_file(
    conn: Option<Arc<dyn HostHandle>>,
    client: &mut dyn ClientConnLike,
    host_id: HostId,
    resource_id: ResourceId,
    path: &str,
    file_size: u32,
) -> Result<(), OrchestratorError> {
    let result = match create_file_setup(conn, client, host_id, resource_id, path, file_size).await {
        // The host's own Error frame for the init request was already forwarded
        // verbatim inside create_file_setup — step 6's "terminate successfully".
        Ok(None) => Ok(()),
        Ok(Some((conn, stream_id))) => match create_file_chunk_loop(conn.as_ref(), client, stream_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // Step 10's best-effort `CreateFileStreamEnd` is this protocol's own
                // mid-transfer failure signal to a client that already has a live
                // stream open — there is no separate `[Error][code]` frame on top
                // of it once the exchange is underway.
                client.send_and_log_error(&[&MsgType::CreateFileStreamEnd.binary()]).await;
                Err(err)
            }
        },
        // No stream was ever opened with the host (unknown host, bad request,
        // wire/IO failure on the init exchange) — same generic `[Error][code]`
        // frame every other protocol sends for a pre-exchange failure.
        Err(err) => Err(fail_client(client, err).await),
    };
    client.close().await;
    result
}

/// Resolves the host connection and runs the init exchange. `Ok(None)` means
/// the host rejected the request with its own `Error` frame, already
/// forwarded to the client. `Ok(Some((conn, stream_id)))` means a stream is
/// open and the chunk loop should run.
async fn create_file_setup(
    conn: Option<Arc<dyn HostHandle>>,
    client: &mut dyn ClientConnLike,
    host_id: HostId,
    resource_id: ResourceId,
    path: &str,
    file_size: u32,
) -> Result<Option<(Arc<dyn HostHandle>, u32)>, OrchestratorError> {
    let conn = conn.ok_or(OrchestratorError::HostNotFound(host_id))?;
    let path_bytes = write_nul_terminated(path)?;

    let init_response = conn
        .query(&[
            &MsgType::CreateFileInitRequest.binary(),
            &write_uuid(resource_id),
            &write_u32(file_size),
            &path_bytes,
        ])
        .await?;

    if get_msg_type(&init_response) == Ok(MsgType::Error) {
        client.send_and_log_error(&[&init_response]).await;
        return Ok(None);
    }

    let (stream_id, _) = get_stream_id(&init_response)?;
    client.send(&[&init_response]).await?;
    Ok(Some((conn, stream_id)))
}

async fn create_file_chunk_loop(
    conn: &dyn HostHandle,
    client: &mut dyn ClientConnLike,
    stream_id: u32,
) -> Result<(), OrchestratorError> {
    loop {
        let chunk_request =
            conn.query(&[&MsgType::CreateFileHostChunkRequest.binary(), &write_u32(stream_id)]).await?;
        client.send(&[&chunk_request]).await?;
        if matches!(get_msg_type(&chunk_request)?, MsgType::Error | MsgType::CreateFileStreamEnd) {
            return Ok(());
        }

        let chunk = client.listen().await?;
        let post_chunk = conn.query(&[&chunk]).await?;
        if matches!(get_msg_type(&post_chunk)?, MsgType::Error | MsgType::CreateFileStreamEnd) {
            client.send(&[&post_chunk]).await?;
            return Ok(());
        }
        // ACK-class response: nothing to forward, loop back for the next chunk request.
    }
}

async fn handshake_connect(conn: &dyn HostHandle, host_id: HostId, key: &HostKey) -> Result<(), OrchestratorError> {
    let key_bytes = write_nul_terminated(&key.encode())?;
    let response =
        conn.query(&[&MsgType::InitWithUuidQuery.binary(), &write_uuid(host_id), &key_bytes]).await?;
    expect_ack(&response)
}

async fn handshake_reconnect(conn: &dyn HostHandle) -> Result<(), OrchestratorError> {
    let response = conn.query(&[&MsgType::InitExistingHost.binary()]).await?;
    expect_ack(&response)
}

fn expect_ack(response: &[u8]) -> Result<(), OrchestratorError> {
    if response == MsgType::Ack.binary() {
        Ok(())
    } else {
        Err(OrchestratorError::UnexpectedMessageType)
    }
}

/// Best-effort notice to the host that a download stream is dead, sent on
/// both the successful-completion and the abnormal-exit paths of the
/// download loop (spec §4.F step 5 / step 8). Failure is logged, not
/// propagated — the caller is already on its way out with its own result.
async fn send_download_completion(conn: &dyn HostHandle, stream_id: u32) {
    if let Err(err) = conn.query(&[&MsgType::DownloadCompletionRequest.binary(), &write_u32(stream_id)]).await {
        tracing::warn!(%stream_id, error = %err, "failed to deliver download completion to host");
    }
}

/// Delivers the `[Error][code]` frame for `err` to the client and returns it
/// unchanged, so callers can write `Err(fail_client(client, err).await)`.
async fn fail_client(client: &mut dyn ClientConnLike, err: OrchestratorError) -> OrchestratorError {
    let frame = err.kind().to_frame();
    client.send_and_log_error(&[&frame]).await;
    err
}
