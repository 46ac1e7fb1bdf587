//! Cache Entry Module
//!
//! Defines a cached payload with its storage and expiration timestamps.
//! The serialized form is the persisted snapshot format:
//! `{"timestamp": <epoch s>, "expiration": <epoch s>, "data": "<data uri>"}`.

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached payload and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was stored (Unix seconds)
    #[serde(rename = "timestamp")]
    pub stored_at: i64,
    /// When the entry stops being served (Unix seconds)
    #[serde(rename = "expiration")]
    pub expires_at: i64,
    /// The cached payload, a base64 data URI
    pub data: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored at `now` that lives for `ttl_seconds`.
    ///
    /// A TTL of zero is raised to one second so `expires_at > stored_at`
    /// always holds.
    pub fn new(data: String, ttl_seconds: u64, now: i64) -> Self {
        let ttl = i64::try_from(ttl_seconds.max(1)).unwrap_or(i64::MAX);
        Self {
            stored_at: now,
            expires_at: now.saturating_add(ttl),
            data,
        }
    }

    // == Is Expired ==
    /// An entry is served only while `now < expires_at`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
