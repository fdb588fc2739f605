//! URL parameter parsing shared by every protocol-3..6 handler.
//!
//! Grounded in `original_source/.../controllers/host/controller.go`'s
//! `GetResourceMetadata`/`DownloadResource`/`UploadResource`: parse first,
//! `ws_errors.InvalidUrlParams`/`MissingRequiredParams` on failure — never
//! a plain HTTP 400, since the socket is already upgraded by the time
//! validation runs (SPEC_FULL §6).

use std::collections::HashMap;

use uuid::Uuid;
use wharf_core::{ErrorKind, HostId, ResourceId};

pub fn parse_resource_path(
    host_id_raw: &str,
    resource_id_raw: &str,
    path_raw: &str,
) -> Result<(HostId, ResourceId, String), ErrorKind> {
    let host_id: Uuid = host_id_raw.parse().map_err(|_| ErrorKind::InvalidUrlParams)?;
    let resource_id: Uuid = resource_id_raw.parse().map_err(|_| ErrorKind::InvalidUrlParams)?;
    // Axum's `{*path}` wildcard segment keeps the leading slash; the wire
    // protocol wants the bare resource-relative path.
    let path = path_raw.trim_start_matches('/').to_string();
    Ok((host_id, resource_id, path))
}

pub fn required_query<'a>(query: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ErrorKind> {
    match query.get(key) {
        Some(value) if !value.is_empty() => Ok(value.as_str()),
        _ => Err(ErrorKind::MissingRequiredParams),
    }
}

/// Protocol 5's upload query params: `name`, `type=file`, and the
/// SPEC_FULL-added `uploadFileSize` (Design Note 5).
pub fn parse_upload_params(query: &HashMap<String, String>) -> Result<u32, ErrorKind> {
    let _name = required_query(query, "name")?;

    let upload_type = required_query(query, "type")?;
    if upload_type != "file" {
        // `dir` is a recognized value upstream but its semantics are
        // undefined (spec §9 Open Question 2) — reject rather than guess.
        return Err(ErrorKind::InvalidUploadType);
    }

    let file_size_raw = required_query(query, "uploadFileSize")?;
    file_size_raw.parse::<u32>().map_err(|_| ErrorKind::InvalidUrlParams)
}
