//! Cache Module
//!
//! Expiring key/value store for fetched logo payloads, keyed by request URL.

mod clock;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key (URL) length in bytes
pub const MAX_KEY_LENGTH: usize = 4096;

/// Default payload quota in bytes
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MiB
