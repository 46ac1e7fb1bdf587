//! Response DTOs for the comparison API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::evaluator::{BatchReport, PairResult};
use crate::fetch::data_uri;

/// One evaluated pair, images inlined as PNG data URIs.
#[derive(Debug, Clone, Serialize)]
pub struct PairResponse {
    pub id: String,
    pub label: Option<String>,
    pub similarity: f64,
    pub threshold: f64,
    pub below_threshold: bool,
    pub original_missing: bool,
    pub replaced_missing: bool,
    pub original_image: Option<String>,
    pub replaced_image: Option<String>,
}

impl From<&PairResult> for PairResponse {
    fn from(result: &PairResult) -> Self {
        Self {
            id: result.id().to_string(),
            label: result.label().map(str::to_string),
            similarity: result.similarity(),
            threshold: result.threshold(),
            below_threshold: result.below_threshold(),
            original_missing: result.original_missing(),
            replaced_missing: result.replaced_missing(),
            original_image: result
                .original_image()
                .map(|png| data_uri::encode(png, "image/png")),
            replaced_image: result
                .replaced_image()
                .map(|png| data_uri::encode(png, "image/png")),
        }
    }
}

/// A pair whose original logo is absent while the replacement exists.
#[derive(Debug, Clone, Serialize)]
pub struct MissingTeam {
    pub id: String,
    pub label: Option<String>,
}

/// Response body for POST /batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    /// Pairs evaluated
    pub total: usize,
    /// Pairs scoring below their threshold
    pub below_threshold: usize,
    pub missing_teams: Vec<MissingTeam>,
    pub results: Vec<PairResponse>,
}

impl BatchResponse {
    pub fn from_report(report: &BatchReport, below_threshold_only: bool) -> Self {
        let results = report
            .results()
            .iter()
            .filter(|r| !below_threshold_only || r.below_threshold())
            .map(PairResponse::from)
            .collect();

        Self {
            total: report.len(),
            below_threshold: report.below_threshold().count(),
            missing_teams: report
                .missing_teams()
                .map(|r| MissingTeam {
                    id: r.id().to_string(),
                    label: r.label().map(str::to_string),
                })
                .collect(),
            results,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub writes: u64,
    pub rejected_writes: u64,
    /// Stored entries, expired ones included
    pub total_entries: usize,
    pub expired_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, expired_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            writes: stats.writes,
            rejected_writes: stats.rejected_writes,
            total_entries: stats.total_entries,
            expired_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
