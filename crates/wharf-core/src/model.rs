//! Persisted reconnect credentials (spec §3, §4.E).

use chrono::{DateTime, Utc};

use crate::ids::{HashString, HostId};

/// `{ id, keyHash, createdAt }` — created or renewed on every successful
/// connect/reconnect. Kept free of any storage-engine dependency; the
/// `wharf-storage` crate maps its own `sqlx::FromRow` row type into this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedConnection {
    pub id: HostId,
    pub key_hash: HashString,
    pub created_at: DateTime<Utc>,
}
