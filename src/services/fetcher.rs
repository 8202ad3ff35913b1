// src/services/fetcher.rs

//! Page fetching with bounded linear backoff.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::PageRequest;
use crate::services::pages::PageSource;

/// Retry schedule: `max_attempts` tries, pausing `attempt × step × unit`
/// after each failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: u32,
    pub unit: Duration,
}

impl RetryPolicy {
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const STEP: u32 = 5;

    pub fn new(unit: Duration) -> Self {
        Self {
            max_attempts: Self::MAX_ATTEMPTS,
            step: Self::STEP,
            unit,
        }
    }

    /// Pause taken after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.unit * attempt.saturating_mul(self.step)
    }

    /// Every pause in order, one per attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).map(|attempt| self.delay_after(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Fetches pages through a [`PageSource`], retrying failures.
///
/// Exhaustion is returned as [`AppError::FetchExhausted`] and left to the
/// caller to report. Several pages may be in flight at once, and only the
/// one that ends the run is alerted.
pub struct PageFetcher {
    source: Arc<dyn PageSource>,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(source: Arc<dyn PageSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub async fn fetch(&self, request: &PageRequest) -> Result<String> {
        let label = request.label();
        let max = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max {
            match self.source.fetch(request).await {
                Ok(body) => {
                    if attempt > 1 {
                        log::info!("Fetched {} on try {}/{}", label, attempt, max);
                    }
                    return Ok(body);
                }
                Err(error) => {
                    let delay = self.policy.delay_after(attempt);
                    log::warn!(
                        "Try {}/{} has failed for {}: {}. Going to sleep for {:?}.",
                        attempt,
                        max,
                        label,
                        error.detail(),
                        delay
                    );
                    last_error = error.detail();
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(AppError::FetchExhausted {
            target: label,
            attempts: max,
            message: last_error,
        })
    }
}
