//! Identifiers used throughout the protocols (spec §3).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// 128-bit identifier of a host connection. Minted once per host on first
/// connect and persists across reconnects.
pub type HostId = Uuid;

/// 128-bit identifier of a root resource a host exposes. Opaque to the
/// server — it is only ever echoed back to the host.
pub type ResourceId = Uuid;

/// 32-bit id a host allocates for one transfer (download or upload) and
/// the server echoes back for the lifetime of that transfer.
pub type StreamId = u32;

/// A 32-byte cryptographically random value handed to a host exactly once,
/// on its first connect, and never persisted in cleartext (only
/// [`HashString`] of it is stored).
#[derive(Clone)]
pub struct HostKey([u8; 32]);

impl HostKey {
    /// Generates a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Base64url (no padding) encoding of the raw key — what is actually
    /// sent to the host and, later, presented back on reconnect.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parses a previously-encoded key as presented by a reconnecting host.
    pub fn decode(s: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(s).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Computes [`HashString`] of this key, the only form ever persisted.
    pub fn hash(&self) -> HashString {
        HashString::of(&self.0)
    }
}

/// `base64url(SHA-256(bytes))` — used only to store host keys at rest
/// (spec §3, §4.E). Never reversible; compared by value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HashString(String);

impl HashString {
    /// Hashes arbitrary bytes (in practice, a decoded [`HostKey`]).
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Wraps an already-hashed string as read back from storage.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HashString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
