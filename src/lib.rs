//! Logo Similarity - perceptual comparison of original and replacement logos
//!
//! Fetches logo pairs through an expiring cache, fingerprints them with an
//! average hash and flags replacements that drift below a similarity threshold.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fetch;
pub mod imaging;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{LogoError, Result};
pub use tasks::spawn_snapshot_task;
