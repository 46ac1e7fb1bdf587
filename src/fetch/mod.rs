//! Fetch Module
//!
//! Retrieves logo bytes over HTTP with retry/backoff, backed by the cache store.

pub mod data_uri;
mod fetcher;
mod retry;
mod transport;

pub use fetcher::{parse_max_age, Fetcher, SourceRole, TtlPolicy};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{HttpTransport, Transport, TransportResponse};

// == Public Constants ==
/// Default cache lifetime for original catalog logos (1 hour)
pub const DEFAULT_ORIGINAL_TTL: u64 = 60 * 60;

/// Default cache lifetime for replacement CDN logos (3 weeks)
pub const DEFAULT_REPLACED_TTL: u64 = 60 * 60 * 24 * 21;
