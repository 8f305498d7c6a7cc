// src/polling/mod.rs — Polling widget data sources

pub mod fetcher;
pub mod retry;
pub mod source;
pub mod state;

use std::time::Duration;

use crate::infra::errors::FitdashError;

pub use fetcher::{from_fn, Fetcher};
pub use source::PollingSource;
pub use state::{ErrorInfo, ErrorKind, FetchState, FetchStatus};

const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Schedule for one polling source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Delay between automatic refreshes
    pub interval: Duration,
    /// Run the timer at all; manual refreshes work either way
    pub enabled: bool,
    /// Fetch once on start instead of waiting a full interval
    pub immediate: bool,
    /// Abort in-flight fetches on stop rather than just ignoring their results
    pub abort_on_stop: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            enabled: true,
            immediate: true,
            abort_on_stop: false,
        }
    }
}

impl PollingConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FitdashError> {
        if self.enabled && self.interval.is_zero() {
            return Err(FitdashError::Config(
                "polling interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
