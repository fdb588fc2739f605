//! Crash-safe storage of reconnect credentials (spec §4.E).
//!
//! Grounded in
//! `original_source/.../saved_connections_repository/repository.go` for the
//! shape of the two operations (`GetById`, `AddOrRenew`) and in
//! `clawde-io-apps/daemon/src/mailbox/storage.rs` for the idiomatic Rust
//! rendition: a `#[derive(sqlx::FromRow)]` row type private to this module,
//! `SqlitePool` held by value, `query`/`query_as` with bound parameters.
//!
//! One correction versus the Go source: its `GetById` compares
//! `created_at < validTo` where `validTo` is *today plus* the TTL, which
//! would accept every row ever written. The TTL semantics spec §4.E
//! actually specifies — `createdAt >= now − ValidForDays` — are what this
//! module implements.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use wharf_core::{HashString, HostId, SavedConnection};

use crate::error::StorageError;

#[derive(sqlx::FromRow)]
struct SavedConnectionRow {
    id: String,
    key_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SavedConnectionRow> for SavedConnection {
    type Error = uuid::Error;

    fn try_from(row: SavedConnectionRow) -> Result<Self, Self::Error> {
        Ok(SavedConnection {
            id: row.id.parse()?,
            key_hash: HashString::from_stored(row.key_hash),
            created_at: row.created_at,
        })
    }
}

/// Storage-engine-agnostic seam — lets the orchestrator be tested against
/// an in-memory fake without pulling sqlx into its test dependencies.
#[async_trait]
pub trait SavedConnections: Send + Sync {
    async fn get_by_id(&self, id: HostId) -> Result<Option<SavedConnection>, StorageError>;
    async fn add_or_renew(&self, record: &SavedConnection) -> Result<(), StorageError>;
}

/// Sqlite-backed implementation, used in production.
#[derive(Clone)]
pub struct SqliteSavedConnections {
    pool: SqlitePool,
    valid_for: ChronoDuration,
}

impl SqliteSavedConnections {
    pub fn new(pool: SqlitePool, valid_for_days: i64) -> Self {
        Self { pool, valid_for: ChronoDuration::days(valid_for_days) }
    }

    /// Runs every migration under `migrations_path` (spec §6,
    /// `DATABASE_MIGRATIONS_PATH`) against `pool`, blocking startup until
    /// the schema is current.
    pub async fn migrate(pool: &SqlitePool, migrations_path: &std::path::Path) -> Result<(), StorageError> {
        let migrator = sqlx::migrate::Migrator::new(migrations_path).await?;
        migrator.run(pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SavedConnections for SqliteSavedConnections {
    async fn get_by_id(&self, id: HostId) -> Result<Option<SavedConnection>, StorageError> {
        let cutoff = Utc::now() - self.valid_for;
        let row: Option<SavedConnectionRow> = sqlx::query_as(
            "SELECT id, key_hash, created_at
             FROM saved_connections
             WHERE id = ? AND created_at >= ?
             LIMIT 1",
        )
        .bind(id.to_string())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.try_into().ok()))
    }

    async fn add_or_renew(&self, record: &SavedConnection) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO saved_connections (id, key_hash, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 key_hash = excluded.key_hash,
                 created_at = excluded.created_at",
        )
        .bind(record.id.to_string())
        .bind(record.key_hash.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn in_memory_store() -> SqliteSavedConnections {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE saved_connections (
                 id TEXT PRIMARY KEY,
                 key_hash TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .unwrap();
        SqliteSavedConnections::new(pool, 30)
    }

    fn sample(id: HostId, created_at: DateTime<Utc>) -> SavedConnection {
        SavedConnection { id, key_hash: HashString::of(b"some-key"), created_at }
    }

    #[tokio::test]
    async fn round_trips_a_fresh_record() {
        let store = in_memory_store().await;
        let record = sample(HostId::new_v4(), Utc::now());
        store.add_or_renew(&record).await.unwrap();

        let found = store.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn renew_updates_created_at_in_place() {
        let store = in_memory_store().await;
        let id = HostId::new_v4();
        let original = sample(id, Utc::now() - ChronoDuration::days(10));
        store.add_or_renew(&original).await.unwrap();

        let renewed = sample(id, Utc::now());
        store.add_or_renew(&renewed).await.unwrap();

        let found = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.created_at, renewed.created_at);
    }

    #[tokio::test]
    async fn a_record_older_than_the_ttl_is_treated_as_absent() {
        let store = in_memory_store().await;
        let id = HostId::new_v4();
        let stale = sample(id, Utc::now() - ChronoDuration::days(31));
        store.add_or_renew(&stale).await.unwrap();

        assert!(store.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = in_memory_store().await;
        assert!(store.get_by_id(HostId::new_v4()).await.unwrap().is_none());
    }
}
