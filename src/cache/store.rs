//! Cache Store Module
//!
//! Expiring key/value store combining HashMap storage with LRU eviction.
//! Expired entries are never removed on read; they stay until a fresh fetch
//! overwrites them or capacity pressure evicts them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, Clock, LruTracker, SystemClock, DEFAULT_MAX_PAYLOAD_BYTES,
    MAX_KEY_LENGTH,
};
use crate::error::{LogoError, Result};

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    /// URL -> entry
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    stats: CacheStats,
    /// Maximum number of entries kept
    max_entries: usize,
    /// Largest payload accepted by `set`
    max_payload_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store on the system clock.
    pub fn new(max_entries: usize, max_payload_bytes: usize) -> Self {
        Self::with_clock(max_entries, max_payload_bytes, Arc::new(SystemClock))
    }

    /// Creates a store with an explicit time source.
    pub fn with_clock(max_entries: usize, max_payload_bytes: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            max_payload_bytes,
            clock,
        }
    }

    // == Get ==
    /// Returns the payload for `key` while its entry is live.
    ///
    /// Missing and expired entries both yield `None`.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let data = entry.data.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(data)
            }
            Some(_) => {
                debug!("Cache entry expired: {}", key);
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores or overwrites `key` with a payload living `ttl_seconds`.
    ///
    /// Fails with `CacheWrite` when the key or payload exceeds the store's
    /// limits, or when the store has no capacity at all.
    pub fn set(&mut self, key: impl Into<String>, payload: String, ttl_seconds: u64) -> Result<()> {
        let key = key.into();

        if key.len() > MAX_KEY_LENGTH {
            self.stats.record_rejected_write();
            return Err(LogoError::CacheWrite(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        if payload.len() > self.max_payload_bytes {
            self.stats.record_rejected_write();
            return Err(LogoError::CacheWrite(format!(
                "Payload of {} bytes exceeds quota of {} bytes",
                payload.len(),
                self.max_payload_bytes
            )));
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    debug!("Evicting least recently used entry: {}", evicted);
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
                None => {
                    self.stats.record_rejected_write();
                    return Err(LogoError::CacheWrite(
                        "Cache has no capacity".to_string(),
                    ));
                }
            }
        }

        let entry = CacheEntry::new(payload, ttl_seconds, self.clock.now());
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);

        self.stats.record_write();
        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Entry ==
    /// Raw entry for `key`, expired or not. Does not count as a lookup.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of stored entries that are past their expiration.
    pub fn expired_count(&self) -> usize {
        let now = self.clock.now();
        self.entries.values().filter(|e| e.is_expired(now)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Snapshot ==
    /// Serializes every entry into the persisted JSON object, keyed by URL.
    pub fn to_snapshot(&self) -> Result<String> {
        let ordered: BTreeMap<&String, &CacheEntry> = self.entries.iter().collect();
        serde_json::to_string(&ordered).map_err(|e| LogoError::Snapshot(e.to_string()))
    }

    /// Loads entries from a persisted JSON object, replacing same-key entries.
    ///
    /// Entries already expired are skipped. Entries past capacity or quota are
    /// dropped the same way a live write would be. Returns the number loaded.
    pub fn restore_snapshot(&mut self, json: &str) -> Result<usize> {
        let snapshot: HashMap<String, CacheEntry> =
            serde_json::from_str(json).map_err(|e| LogoError::Snapshot(e.to_string()))?;

        let now = self.clock.now();
        let mut loaded = 0;
        for (key, entry) in snapshot {
            if entry.is_expired(now) || entry.expires_at <= entry.stored_at {
                continue;
            }
            if entry.data.len() > self.max_payload_bytes || key.len() > MAX_KEY_LENGTH {
                continue;
            }
            if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.entries.remove(&evicted);
                        self.stats.record_eviction();
                    }
                    None => break,
                }
            }
            self.lru.touch(&key);
            self.entries.insert(key, entry);
            loaded += 1;
        }

        self.stats.set_total_entries(self.entries.len());
        Ok(loaded)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(1000, DEFAULT_MAX_PAYLOAD_BYTES)
    }
}
