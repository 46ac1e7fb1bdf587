//! API Handlers
//!
//! HTTP request handlers for each comparison service endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{extract::State, Json};
use tracing::warn;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::Result;
use crate::evaluator::{write_exports, BatchRunner, PairEvaluator};
use crate::fetch::{Fetcher, HttpTransport, Transport};
use crate::models::{
    BatchRequest, BatchResponse, CompareRequest, HealthResponse, PairResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache store is wrapped in Arc<RwLock<>> and shared with the fetcher
/// and the snapshot task.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe fetch cache
    pub cache: Arc<RwLock<CacheStore>>,
    pub evaluator: Arc<PairEvaluator>,
    pub runner: Arc<BatchRunner>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the cache, fetcher, evaluator and batch runner around `transport`.
    pub fn new(
        config: &Config,
        cache: Arc<RwLock<CacheStore>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(cache.clone(), transport, config.retry_policy()));
        let evaluator = Arc::new(PairEvaluator::new(fetcher, config.evaluator_settings()?));
        let runner = Arc::new(BatchRunner::new(evaluator.clone(), config.pair_delay()));

        Ok(Self {
            cache,
            evaluator,
            runner,
            config: Arc::new(config.clone()),
        })
    }

    /// Creates a new AppState with an empty cache sized from `config`.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let cache = CacheStore::new(config.max_entries, config.max_payload_bytes);
        Self::new(config, Arc::new(RwLock::new(cache)), transport)
    }

    /// Creates a new AppState from configuration, fetching over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }
}

/// Handler for POST /compare
///
/// Evaluates one pair. Fetch and decode failures show up as missing flags,
/// not as errors.
pub async fn compare_handler(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<PairResponse>> {
    let request = req.into_pair_request(&state.config)?;
    let result = state.evaluator.evaluate(&request).await;

    Ok(Json(PairResponse::from(&result)))
}

/// Handler for POST /batch
///
/// Evaluates a range or list of pairs in order and returns the report.
pub async fn batch_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>> {
    let sources = req.sources(state.config.max_batch_pairs)?;
    let options = req.options(&state.config)?;

    let report = state.runner.run(&sources, &options).await;

    if let Some(dir) = &state.config.export_dir {
        if let Err(err) = write_exports(&report, dir).await {
            warn!("Batch export failed: {}", err);
        }
    }

    Ok(Json(BatchResponse::from_report(
        &report,
        req.below_threshold_only,
    )))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    // Acquire read lock for stats
    let cache = state.cache.read().await;

    Json(StatsResponse::new(&cache.stats(), cache.expired_count()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
