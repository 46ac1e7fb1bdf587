//! Pair evaluation.
//!
//! Each pair runs two independent legs (original and replacement). A leg
//! moves `Pending -> Fetched -> Decoded -> Ready`, or drops to `Missing` on
//! the first fetch or decode failure. Leg failures never escape the
//! evaluator; they become the `*_missing` flags of the result.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LogoError, Result};
use crate::fetch::{Fetcher, SourceRole, TtlPolicy};
use crate::imaging::{self, Fingerprint, GridSize};

/// Strict comparison: a score equal to the threshold passes.
pub fn is_below_threshold(similarity: f64, threshold: f64) -> bool {
    similarity < threshold
}

// == Request ==
/// One pair to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRequest {
    pub id: String,
    pub label: Option<String>,
    pub original_url: String,
    pub replaced_url: String,
    /// Similarity threshold, 0–100
    pub threshold: f64,
    /// Default cache TTL for the original leg (seconds, 0 = built-in)
    pub original_ttl: u64,
    /// Default cache TTL for the replacement leg (seconds, 0 = built-in)
    pub replaced_ttl: u64,
}

impl PairRequest {
    pub fn validate(&self) -> Result<()> {
        if self.original_url.trim().is_empty() || self.replaced_url.trim().is_empty() {
            return Err(LogoError::InvalidRequest(
                "Both original and replacement URLs are required".to_string(),
            ));
        }
        validate_threshold(self.threshold)
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(self.original_ttl, self.replaced_ttl)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
        return Err(LogoError::InvalidRequest(format!(
            "Threshold {} must be between 0 and 100",
            threshold
        )));
    }
    Ok(())
}

// == Result ==
/// Outcome of one evaluated pair. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    id: String,
    label: Option<String>,
    original_image: Option<Vec<u8>>,
    replaced_image: Option<Vec<u8>>,
    similarity: f64,
    threshold: f64,
    original_missing: bool,
    replaced_missing: bool,
}

impl PairResult {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Display-sized PNG of the original logo
    pub fn original_image(&self) -> Option<&[u8]> {
        self.original_image.as_deref()
    }

    /// Display-sized PNG of the replacement logo
    pub fn replaced_image(&self) -> Option<&[u8]> {
        self.replaced_image.as_deref()
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn original_missing(&self) -> bool {
        self.original_missing
    }

    pub fn replaced_missing(&self) -> bool {
        self.replaced_missing
    }

    pub fn below_threshold(&self) -> bool {
        is_below_threshold(self.similarity, self.threshold)
    }

    /// Original logo absent while the replacement exists.
    pub fn is_missing_team(&self) -> bool {
        self.original_missing && !self.replaced_missing
    }
}

// == Leg State ==
struct ReadyLeg {
    display_png: Vec<u8>,
    fingerprint: Fingerprint,
}

enum LegState {
    Pending,
    Fetched(Vec<u8>),
    Decoded(DynamicImage),
    Ready(ReadyLeg),
    Missing(LogoError),
}

impl LegState {
    fn name(&self) -> &'static str {
        match self {
            LegState::Pending => "pending",
            LegState::Fetched(_) => "fetched",
            LegState::Decoded(_) => "decoded",
            LegState::Ready(_) => "ready",
            LegState::Missing(_) => "missing",
        }
    }
}

// == Settings ==
/// Grid sizes used by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorSettings {
    /// Grid the fingerprint is computed on
    pub hash_grid: GridSize,
    /// Size of the PNGs handed back for display
    pub display_size: GridSize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            hash_grid: GridSize::HASH,
            display_size: GridSize::DISPLAY,
        }
    }
}

// == Pair Evaluator ==
pub struct PairEvaluator {
    fetcher: Arc<Fetcher>,
    settings: EvaluatorSettings,
}

impl PairEvaluator {
    pub fn new(fetcher: Arc<Fetcher>, settings: EvaluatorSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> EvaluatorSettings {
        self.settings
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    // == Evaluate ==
    /// Fetches, decodes and compares both legs of `request`.
    ///
    /// Both legs always run. Similarity is 0 when either leg is missing.
    pub async fn evaluate(&self, request: &PairRequest) -> PairResult {
        let ttl = request.ttl_policy();
        let (original, replaced) = tokio::join!(
            self.run_leg(&request.original_url, SourceRole::Original, ttl),
            self.run_leg(&request.replaced_url, SourceRole::Replaced, ttl),
        );

        let similarity = match (&original, &replaced) {
            (LegState::Ready(a), LegState::Ready(b)) => {
                imaging::similarity(&a.fingerprint, &b.fingerprint).unwrap_or_else(|err| {
                    warn!("Pair {}: {}", request.id, err);
                    0.0
                })
            }
            _ => 0.0,
        };

        let (original_image, original_missing) = into_display(original, &request.id, SourceRole::Original);
        let (replaced_image, replaced_missing) = into_display(replaced, &request.id, SourceRole::Replaced);

        debug!(
            "Pair {}: similarity={:.2}% original_missing={} replaced_missing={}",
            request.id, similarity, original_missing, replaced_missing
        );

        PairResult {
            id: request.id.clone(),
            label: request.label.clone(),
            original_image,
            replaced_image,
            similarity,
            threshold: request.threshold,
            original_missing,
            replaced_missing,
        }
    }

    async fn run_leg(&self, url: &str, role: SourceRole, ttl: TtlPolicy) -> LegState {
        let settings = self.settings;
        let mut state = LegState::Pending;

        loop {
            state = match state {
                LegState::Pending => match self.fetcher.fetch_bytes(url, role, ttl).await {
                    Ok(bytes) => LegState::Fetched(bytes),
                    Err(err) => LegState::Missing(err),
                },
                LegState::Fetched(bytes) => {
                    match blocking(move || imaging::decode(&bytes)).await {
                        Ok(image) => LegState::Decoded(image),
                        Err(err) => LegState::Missing(err),
                    }
                }
                LegState::Decoded(image) => {
                    let prepared = blocking(move || {
                        let display_png = imaging::resize_to_png(&image, settings.display_size)?;
                        let fingerprint = imaging::fingerprint_image(&image, settings.hash_grid);
                        Ok(ReadyLeg {
                            display_png,
                            fingerprint,
                        })
                    })
                    .await;
                    match prepared {
                        Ok(ready) => LegState::Ready(ready),
                        Err(err) => LegState::Missing(err),
                    }
                }
                done @ (LegState::Ready(_) | LegState::Missing(_)) => return done,
            };
            debug!("{} leg {} -> {}", role, url, state.name());
        }
    }
}

/// Runs CPU-bound image work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LogoError::Internal(format!("Image task failed: {}", e)))?
}

fn into_display(leg: LegState, id: &str, role: SourceRole) -> (Option<Vec<u8>>, bool) {
    match leg {
        LegState::Ready(ready) => (Some(ready.display_png), false),
        LegState::Missing(err) => {
            warn!("Pair {}: {} image missing: {}", id, role, err);
            (None, true)
        }
        _ => (None, true),
    }
}
