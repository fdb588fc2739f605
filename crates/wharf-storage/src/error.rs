use thiserror::Error;
use wharf_core::ErrorKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    /// Every storage failure the orchestrator sees is opaque to the client
    /// — spec never exposes persistence internals over the wire, so this
    /// always collapses to `Unknown`. Kept as a method (rather than a
    /// blanket `impl From`) so the call site stays explicit about why.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Unknown
    }
}
