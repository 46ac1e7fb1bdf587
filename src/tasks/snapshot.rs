//! Cache Snapshot Task
//!
//! Persists the fetch cache to a JSON file so it survives restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::{LogoError, Result};

/// Writes the current cache contents to `path`.
///
/// The JSON is built under a read lock and written after it is released,
/// first to a sibling temp file which is then renamed over `path`.
/// Returns the number of entries written.
pub async fn persist_snapshot(cache: &Arc<RwLock<CacheStore>>, path: &Path) -> Result<usize> {
    let (json, count) = {
        let guard = cache.read().await;
        (guard.to_snapshot()?, guard.len())
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| snapshot_error("create directory for", path, e))?;
    }

    let tmp = temp_path(path)?;
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| snapshot_error("write", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| snapshot_error("replace", path, e))?;

    debug!("Persisted {} cache entries to {}", count, path.display());
    Ok(count)
}

/// Loads live entries from `path` into the cache.
///
/// A missing file is not an error and loads nothing.
pub async fn restore_snapshot(cache: &Arc<RwLock<CacheStore>>, path: &Path) -> Result<usize> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No cache snapshot at {}", path.display());
            return Ok(0);
        }
        Err(e) => return Err(snapshot_error("read", path, e)),
    };

    let loaded = cache.write().await.restore_snapshot(&json)?;
    info!("Restored {} cache entries from {}", loaded, path.display());
    Ok(loaded)
}

/// Sibling of `path` named `<file name>.tmp`.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        LogoError::Snapshot(format!("Snapshot path {} has no file name", path.display()))
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn snapshot_error(action: &str, path: &Path, err: std::io::Error) -> LogoError {
    LogoError::Snapshot(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Spawns a background task that periodically persists the cache.
///
/// # Arguments
/// * `cache` - Arc<RwLock<CacheStore>> shared reference to the cache
/// * `path` - Snapshot file
/// * `interval_secs` - Interval in seconds between snapshots (minimum 1)
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_snapshot_task(
    cache: Arc<RwLock<CacheStore>>,
    path: PathBuf,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache snapshot task for {} every {} seconds",
            path.display(),
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            if let Err(err) = persist_snapshot(&cache, &path).await {
                warn!("Cache snapshot failed: {}", err);
            }
        }
    })
}
