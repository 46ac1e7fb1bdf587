//! Configuration Module
//!
//! Handles loading service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::error::Result;
use crate::evaluator::EvaluatorSettings;
use crate::fetch::{Backoff, RetryPolicy, DEFAULT_ORIGINAL_TTL, DEFAULT_REPLACED_TTL};
use crate::imaging::GridSize;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of cached payloads
    pub max_entries: usize,
    /// Largest payload the cache accepts, in bytes
    pub max_payload_bytes: usize,
    /// Default TTL for original logos, in seconds
    pub original_ttl: u64,
    /// Default TTL for replacement logos, in seconds
    pub replaced_ttl: u64,
    /// Threshold applied when a request does not carry one
    pub default_threshold: f64,
    /// Fetch attempts per URL, including the first
    pub retry_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    pub retry_delay_ms: u64,
    pub retry_backoff: Backoff,
    /// Edge of the square hashing grid
    pub hash_size: u32,
    /// Edge of the square display image
    pub display_size: u32,
    /// Pause between batch pairs, in milliseconds
    pub pair_delay_ms: u64,
    /// HTTP client timeout, in seconds
    pub request_timeout_secs: u64,
    /// Largest batch accepted by the API
    pub max_batch_pairs: usize,
    /// Where the cache is persisted; persistence is off when unset
    pub snapshot_path: Option<PathBuf>,
    /// Seconds between cache snapshots
    pub snapshot_interval: u64,
    /// Where batch images are exported; export is off when unset
    pub export_dir: Option<PathBuf>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `MAX_ENTRIES` - Maximum cached payloads (default: 1000)
    /// - `MAX_PAYLOAD_BYTES` - Cache quota per payload (default: 5 MiB)
    /// - `ORIGINAL_TTL` - Original logo TTL in seconds (default: 3600)
    /// - `REPLACED_TTL` - Replacement logo TTL in seconds (default: 3 weeks)
    /// - `DEFAULT_THRESHOLD` - Similarity threshold (default: 90)
    /// - `RETRY_ATTEMPTS` - Fetch attempts (default: 3)
    /// - `RETRY_DELAY_MS` - Initial retry delay (default: 500)
    /// - `RETRY_BACKOFF` - `fixed` or `exponential` (default: exponential)
    /// - `HASH_SIZE` - Hash grid edge (default: 8)
    /// - `DISPLAY_SIZE` - Display image edge (default: 100)
    /// - `PAIR_DELAY_MS` - Delay between batch pairs (default: 0)
    /// - `REQUEST_TIMEOUT_SECS` - HTTP client timeout (default: 30)
    /// - `MAX_BATCH_PAIRS` - Batch size limit (default: 500)
    /// - `CACHE_SNAPSHOT_PATH` - Snapshot file (default: unset)
    /// - `SNAPSHOT_INTERVAL` - Snapshot period in seconds (default: 60)
    /// - `EXPORT_DIR` - Batch image export directory (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            max_payload_bytes: env_or("MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
            original_ttl: env_or("ORIGINAL_TTL", defaults.original_ttl),
            replaced_ttl: env_or("REPLACED_TTL", defaults.replaced_ttl),
            default_threshold: env_or("DEFAULT_THRESHOLD", defaults.default_threshold),
            retry_attempts: env_or("RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay_ms: env_or("RETRY_DELAY_MS", defaults.retry_delay_ms),
            retry_backoff: env_or("RETRY_BACKOFF", defaults.retry_backoff),
            hash_size: env_or("HASH_SIZE", defaults.hash_size),
            display_size: env_or("DISPLAY_SIZE", defaults.display_size),
            pair_delay_ms: env_or("PAIR_DELAY_MS", defaults.pair_delay_ms),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            max_batch_pairs: env_or("MAX_BATCH_PAIRS", defaults.max_batch_pairs),
            snapshot_path: env_path("CACHE_SNAPSHOT_PATH"),
            snapshot_interval: env_or("SNAPSHOT_INTERVAL", defaults.snapshot_interval),
            export_dir: env_path("EXPORT_DIR"),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            initial_delay: Duration::from_millis(self.retry_delay_ms),
            backoff: self.retry_backoff,
            ..RetryPolicy::default()
        }
    }

    /// Grid sizes for the evaluator; fails on a zero or oversized edge.
    pub fn evaluator_settings(&self) -> Result<EvaluatorSettings> {
        Ok(EvaluatorSettings {
            hash_grid: GridSize::square(self.hash_size)?,
            display_size: GridSize::square(self.display_size)?,
        })
    }

    pub fn pair_delay(&self) -> Duration {
        Duration::from_millis(self.pair_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            max_entries: 1000,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            original_ttl: DEFAULT_ORIGINAL_TTL,
            replaced_ttl: DEFAULT_REPLACED_TTL,
            default_threshold: 90.0,
            retry_attempts: 3,
            retry_delay_ms: 500,
            retry_backoff: Backoff::Exponential,
            hash_size: 8,
            display_size: 100,
            pair_delay_ms: 0,
            request_timeout_secs: 30,
            max_batch_pairs: 500,
            snapshot_path: None,
            snapshot_interval: 60,
            export_dir: None,
        }
    }
}
