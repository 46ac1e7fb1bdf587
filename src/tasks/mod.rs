//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache Snapshot: Persists the fetch cache at configured intervals

mod snapshot;

pub use snapshot::{persist_snapshot, restore_snapshot, spawn_snapshot_task};
