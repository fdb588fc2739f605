//! Turns a [`crate::config::WharfConfig`] into a ready, migrated
//! [`wharf_storage::SqliteSavedConnections`] — the "startup wiring" part of
//! this crate's role (SPEC_FULL crate table).

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use wharf_storage::SqliteSavedConnections;

#[derive(Debug, Error)]
pub enum StorageSetupError {
    #[error("failed to open sqlite database at {path}: {source}")]
    Connect { path: String, source: sqlx::Error },
    #[error(transparent)]
    Migrate(#[from] wharf_storage::StorageError),
}

/// Opens (creating if absent) the sqlite database at `datasource_path`,
/// runs every migration under `migrations_path`, and wraps the resulting
/// pool as a [`SqliteSavedConnections`] with the given TTL.
pub async fn build_saved_connections(
    datasource_path: &Path,
    migrations_path: &Path,
    valid_for_days: i64,
) -> Result<SqliteSavedConnections, StorageSetupError> {
    let options = SqliteConnectOptions::new().filename(datasource_path).create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await.map_err(|source| {
        StorageSetupError::Connect { path: datasource_path.display().to_string(), source }
    })?;

    SqliteSavedConnections::migrate(&pool, migrations_path).await?;
    Ok(SqliteSavedConnections::new(pool, valid_for_days))
}
