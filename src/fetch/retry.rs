//! Retry policy with fixed or exponential backoff.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{LogoError, Result};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failed attempt
    #[default]
    Exponential,
}

impl FromStr for Backoff {
    type Err = LogoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            other => Err(LogoError::InvalidRequest(format!(
                "Unknown backoff '{}', expected 'fixed' or 'exponential'",
                other
            ))),
        }
    }
}

// == Retry Policy ==
/// Bounded attempt budget for transient fetch failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff: Backoff::Exponential,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Policy with deterministic delays, used where timing must be predictable.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff,
            jitter: false,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    // == Delay ==
    /// Delay to wait after the `attempt`-th failure (1-based), before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.backoff {
            Backoff::Fixed => self.initial_delay,
            Backoff::Exponential => {
                let exponent = attempt.saturating_sub(1).min(31);
                self.initial_delay.saturating_mul(1u32 << exponent)
            }
        };
        base.min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let millis = delay.as_millis() as u64;
        delay + Duration::from_millis(fastrand::u64(0..=millis / 4))
    }

    // == Run ==
    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or the attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            "'{}' succeeded on attempt {}/{}",
                            operation_name, attempt, max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    warn!(
                        "'{}' failed after {} attempts: {}",
                        operation_name, max_attempts, err
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.jittered(self.delay_for(attempt));
                    warn!(
                        "'{}' failed on attempt {}/{}, retrying in {:?}: {}",
                        operation_name, attempt, max_attempts, delay, err
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Backoff::Fixed)
    }

    #[test]
    fn test_backoff_from_str() {
        assert_eq!("fixed".parse::<Backoff>().unwrap(), Backoff::Fixed);
        assert_eq!("Exponential".parse::<Backoff>().unwrap(), Backoff::Exponential);
        assert!("linear".parse::<Backoff>().is_err());
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200), Backoff::Fixed);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(5), Duration::from_millis(200));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(500), Backoff::Exponential);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10), policy.max_delay);
        assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.jittered(Duration::from_millis(400));
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = quick(3)
            .run("flaky", || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(LogoError::network("http://x", "connection reset"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(assert_ok!(result), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = quick(3)
            .run("down", || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(LogoError::network("http://x", format!("attempt {}", n)))
            })
            .await;

        let err = assert_err!(result);
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = quick(5)
            .run("decode", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LogoError::Decode("not an image".into()))
            })
            .await;

        assert!(matches!(result, Err(LogoError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_still_attempts_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = quick(0)
            .run("once", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LogoError>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
