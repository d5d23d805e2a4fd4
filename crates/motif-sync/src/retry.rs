//! Retry classification, backoff and the sleeping seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::config::SyncConfig;

/// Capacity-exhaustion backoff never drops below this.
pub const MIN_CAPACITY_BACKOFF: Duration = Duration::from_secs(10);

/// Where retry delays (and jitter) are spent. Tests swap in a recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries:      u32,
    pub capacity_backoff: Duration,
    pub base_backoff:     Duration,
    pub increment:        Duration,
    /// Ceiling on a server-sent `Retry-After`.
    pub max_retry_after:  Duration,
    markers:              Vec<String>,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_retries:      config.max_retries,
            capacity_backoff: Duration::from_millis(config.capacity_backoff_ms),
            base_backoff:     Duration::from_millis(config.base_backoff_ms),
            increment:        Duration::from_millis(config.backoff_increment_ms),
            max_retry_after:  Duration::from_millis(config.max_retry_after_ms),
            markers:          config.capacity_markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// 429 and every 5xx.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// Does the error body say the backend ran out of budget?
    pub fn is_capacity_signal(&self, body: &str) -> bool {
        let body = body.to_lowercase();
        self.markers.iter().any(|m| body.contains(m.as_str()))
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// Capacity exhaustion waits `capacity_backoff × attempt`, at least
    /// [`MIN_CAPACITY_BACKOFF`]. Anything else waits `base + attempt ×
    /// increment`, or the server's `Retry-After` when one was sent. A
    /// `Retry-After` longer than the capacity backoff wins as well. A
    /// `Retry-After` is never honoured beyond `max_retry_after`.
    pub fn delay(&self, attempt: u32, capacity: bool, retry_after: Option<Duration>) -> Duration {
        let retry_after = retry_after.map(|ra| ra.min(self.max_retry_after));
        if capacity {
            let d = (self.capacity_backoff * attempt).max(MIN_CAPACITY_BACKOFF);
            return retry_after.map_or(d, |ra| ra.max(d));
        }
        retry_after.unwrap_or(self.base_backoff + self.increment * attempt)
    }
}

/// `Retry-After` in delta-seconds (a non-negative integer). HTTP dates,
/// fractions and exponents are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    value.parse::<u64>().ok().map(Duration::from_secs)
}
