//! Engine configuration
//!
//! Every knob is an explicit value threaded into the client, the
//! orchestrator, or the analytics calls. The engine never reads
//! process-wide state; wiring configuration from the environment is the
//! caller's concern.

use std::time::Duration;

/// Retry policy for one remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before attempt n (n >= 2) is `base_delay * 2^(n-2)` plus
    /// uniform jitter in `[0, base_delay)`.
    pub base_delay: Duration,
    /// Upper bound on any computed delay. A server reset hint is honored
    /// even past this cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Quota tracking for the rate-limited client.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    /// When the remote reports fewer remaining requests than this, wait for
    /// the quota window to reset before issuing the next call.
    pub threshold: u32,
    /// Cap on any single quota wait.
    pub max_wait: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            threshold: 100,
            max_wait: Duration::from_secs(60),
        }
    }
}

/// HTTP client settings shared by the API adapters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout, independent of the retry budget.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub quota: QuotaPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            quota: QuotaPolicy::default(),
        }
    }
}

/// Per-batch fetch settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// How many identifiers are fetched simultaneously; excess identifiers
    /// wait in FIFO order.
    pub concurrency: usize,
}

impl FetchConfig {
    /// Default settings for code-host batches.
    pub fn code_host() -> Self {
        Self { concurrency: 5 }
    }

    /// Default settings for tracker batches.
    pub fn tracker() -> Self {
        Self { concurrency: 3 }
    }
}

/// Default inactivity threshold for gap detection, in days.
pub const DEFAULT_GAP_THRESHOLD_DAYS: i64 = 4;

/// Accounts excluded from contribution breakdowns unless the caller
/// supplies their own set.
pub fn default_excluded_usernames() -> Vec<String> {
    [
        "root",
        "Local Administrator",
        "Administrator",
        "dependabot[bot]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
