// src/polling/retry.rs — Retry with exponential backoff around a fetcher
//
// Retries: connection failures, timeouts, 429, 5xx.
// Does NOT retry: 4xx, `success: false` envelopes, decode failures.
//
// Disabled by default (max_retries = 0): a failed cycle surfaces as an error
// and the next scheduled tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::fetcher::Fetcher;
use crate::infra::errors::FitdashError;

const MAX_RETRIES: u32 = 0;
const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 10_000;
const JITTER_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl RetryPolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(0.0);

        Duration::from_millis(final_ms as u64)
    }
}

/// Multiplier in [1 - fraction, 1 + fraction], reproducible per attempt.
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

/// Wraps a fetcher and retries transient failures. The whole retry run
/// counts as one fetch cycle to the polling source.
pub struct RetryFetcher<T> {
    inner: Arc<dyn Fetcher<T>>,
    policy: RetryPolicy,
    label: String,
}

impl<T> RetryFetcher<T> {
    pub fn new(inner: Arc<dyn Fetcher<T>>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            label: String::from("fetch"),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[async_trait]
impl<T: Send + 'static> Fetcher<T> for RetryFetcher<T> {
    async fn fetch(&self) -> Result<T, FitdashError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retriable() || attempt >= self.policy.max_retries {
                        return Err(e);
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        widget = %self.label,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
