//! Batch evaluation.
//!
//! Pairs are evaluated strictly one after another so progress stays monotonic
//! and the remote hosts see at most two requests at a time. The caller owns
//! the returned report.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LogoError, Result};
use crate::evaluator::{PairEvaluator, PairRequest, PairResult};

// == Sources ==
/// A pair of logo URLs to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSource {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub original_url: String,
    pub replaced_url: String,
}

fn default_original_suffix() -> String {
    ".png".to_string()
}

/// Consecutive numeric IDs expanded through URL templates: `base + id + suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u64,
    /// Inclusive
    pub end: u64,
    pub original_base_url: String,
    #[serde(default = "default_original_suffix")]
    pub original_suffix: String,
    pub replaced_base_url: String,
    #[serde(default)]
    pub replaced_suffix: String,
}

impl IdRange {
    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(LogoError::InvalidRequest(format!(
                "Range end {} is before start {}",
                self.end, self.start
            )));
        }
        if self.original_base_url.trim().is_empty() || self.replaced_base_url.trim().is_empty() {
            return Err(LogoError::InvalidRequest(
                "Range needs both base URLs".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of ids in the range, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sources(&self) -> Vec<PairSource> {
        (self.start..=self.end)
            .map(|id| PairSource {
                id: id.to_string(),
                label: None,
                original_url: format!("{}{}{}", self.original_base_url, id, self.original_suffix),
                replaced_url: format!("{}{}{}", self.replaced_base_url, id, self.replaced_suffix),
            })
            .collect()
    }
}

// == Options ==
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    pub threshold: f64,
    pub original_ttl: u64,
    pub replaced_ttl: u64,
}

impl BatchOptions {
    fn request_for(&self, source: &PairSource) -> PairRequest {
        PairRequest {
            id: source.id.clone(),
            label: source.label.clone(),
            original_url: source.original_url.clone(),
            replaced_url: source.replaced_url.clone(),
            threshold: self.threshold,
            original_ttl: self.original_ttl,
            replaced_ttl: self.replaced_ttl,
        }
    }
}

// == Progress ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub checked: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.checked as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {:.2}% ({}/{})",
            self.percentage(),
            self.checked,
            self.total
        )
    }
}

// == Report ==
/// Results of a batch in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    results: Vec<PairResult>,
}

impl BatchReport {
    pub fn new(results: Vec<PairResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[PairResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn below_threshold(&self) -> impl Iterator<Item = &PairResult> {
        self.results.iter().filter(|r| r.below_threshold())
    }

    pub fn missing_teams(&self) -> impl Iterator<Item = &PairResult> {
        self.results.iter().filter(|r| r.is_missing_team())
    }

    /// Replacement images of pairs below threshold, named `<id>.png`.
    pub fn replaced_for_export(&self) -> Vec<(String, &[u8])> {
        self.below_threshold()
            .filter_map(|r| r.replaced_image().map(|img| (format!("{}.png", r.id()), img)))
            .collect()
    }

    /// Every available original image, named `<id>.png`.
    pub fn originals_for_export(&self) -> Vec<(String, &[u8])> {
        self.results
            .iter()
            .filter_map(|r| r.original_image().map(|img| (format!("{}.png", r.id()), img)))
            .collect()
    }
}

// == Batch Runner ==
pub struct BatchRunner {
    evaluator: Arc<PairEvaluator>,
    /// Pause between consecutive pairs
    pair_delay: Duration,
}

impl BatchRunner {
    pub fn new(evaluator: Arc<PairEvaluator>, pair_delay: Duration) -> Self {
        Self {
            evaluator,
            pair_delay,
        }
    }

    pub async fn run(&self, sources: &[PairSource], options: &BatchOptions) -> BatchReport {
        self.run_with_progress(sources, options, |_| {}).await
    }

    /// Evaluates `sources` in order, reporting progress after each pair.
    pub async fn run_with_progress<F>(
        &self,
        sources: &[PairSource],
        options: &BatchOptions,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress),
    {
        let total = sources.len();
        let mut results = Vec::with_capacity(total);

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.pair_delay.is_zero() {
                tokio::time::sleep(self.pair_delay).await;
            }

            let request = options.request_for(source);
            results.push(self.evaluator.evaluate(&request).await);

            let progress = BatchProgress {
                checked: index + 1,
                total,
            };
            info!("{}", progress);
            on_progress(progress);
        }

        BatchReport::new(results)
    }
}
