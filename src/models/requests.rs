//! Request DTOs for the comparison API
//!
//! Defines the structure of incoming HTTP request bodies. Optional fields
//! fall back to the server configuration.

use serde::Deserialize;

use crate::config::Config;
use crate::error::{LogoError, Result};
use crate::evaluator::{validate_threshold, BatchOptions, IdRange, PairRequest, PairSource};

/// Request body for POST /compare
#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub original_url: String,
    pub replaced_url: String,
    /// Similarity threshold, 0–100
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Cache TTL in seconds for the original logo
    #[serde(default)]
    pub original_ttl: Option<u64>,
    /// Cache TTL in seconds for the replacement logo
    #[serde(default)]
    pub replaced_ttl: Option<u64>,
}

impl CompareRequest {
    /// Resolves defaults from `config` and validates the result.
    pub fn into_pair_request(self, config: &Config) -> Result<PairRequest> {
        if self.id.trim().is_empty() {
            return Err(LogoError::InvalidRequest("Pair id cannot be empty".to_string()));
        }
        let request = PairRequest {
            id: self.id,
            label: self.label,
            original_url: self.original_url,
            replaced_url: self.replaced_url,
            threshold: self.threshold.unwrap_or(config.default_threshold),
            original_ttl: self.original_ttl.unwrap_or(config.original_ttl),
            replaced_ttl: self.replaced_ttl.unwrap_or(config.replaced_ttl),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Request body for POST /batch
///
/// Exactly one of `range` or `pairs` must be given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub range: Option<IdRange>,
    #[serde(default)]
    pub pairs: Option<Vec<PairSource>>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub original_ttl: Option<u64>,
    #[serde(default)]
    pub replaced_ttl: Option<u64>,
    /// Only return pairs scoring below the threshold
    #[serde(default)]
    pub below_threshold_only: bool,
}

impl BatchRequest {
    pub fn options(&self, config: &Config) -> Result<BatchOptions> {
        let threshold = self.threshold.unwrap_or(config.default_threshold);
        validate_threshold(threshold)?;
        Ok(BatchOptions {
            threshold,
            original_ttl: self.original_ttl.unwrap_or(config.original_ttl),
            replaced_ttl: self.replaced_ttl.unwrap_or(config.replaced_ttl),
        })
    }

    /// Expands the request into the ordered list of pairs to evaluate.
    ///
    /// Rejects ambiguous, empty or oversized batches.
    pub fn sources(&self, max_pairs: usize) -> Result<Vec<PairSource>> {
        let sources = match (&self.range, &self.pairs) {
            (Some(_), Some(_)) => {
                return Err(LogoError::InvalidRequest(
                    "Provide either a range or a pair list, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(LogoError::InvalidRequest(
                    "Provide a range or a pair list".to_string(),
                ))
            }
            (Some(range), None) => {
                range.validate()?;
                if range.len() > max_pairs as u64 {
                    return Err(too_many(range.len(), max_pairs));
                }
                range.sources()
            }
            (None, Some(pairs)) => {
                if pairs.len() > max_pairs {
                    return Err(too_many(pairs.len() as u64, max_pairs));
                }
                pairs.clone()
            }
        };

        if sources.is_empty() {
            return Err(LogoError::InvalidRequest("Batch is empty".to_string()));
        }
        if let Some(bad) = sources
            .iter()
            .find(|s| s.original_url.trim().is_empty() || s.replaced_url.trim().is_empty())
        {
            return Err(LogoError::InvalidRequest(format!(
                "Pair {} is missing a URL",
                bad.id
            )));
        }
        Ok(sources)
    }
}

fn too_many(requested: u64, max_pairs: usize) -> LogoError {
    LogoError::InvalidRequest(format!(
        "Batch of {} pairs exceeds the limit of {}",
        requested, max_pairs
    ))
}
