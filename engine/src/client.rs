//! Rate-limited HTTP client
//!
//! Wraps a transport that executes one HTTP attempt and turns it into a
//! classified, retrying `call`:
//! - responses are classified as ok / rate-limited / forbidden / transient /
//!   fatal,
//! - rate-limited and transient failures are retried with exponential
//!   backoff plus jitter, honoring server reset hints,
//! - remaining-quota headers are tracked so an exhausted window is waited
//!   out instead of burned through,
//! - a forbidden primary endpoint can fall back to an alternate endpoint
//!   exactly once.
//!
//! Cancellation is observed between attempts, never mid-request; a request
//! that hangs is cut by the transport's own timeout and classified as
//! transient.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;

use crate::cancel::CancellationToken;
use crate::config::{QuotaPolicy, RetryPolicy};
use crate::error::ApiError;

/// Page size for paginated listings.
const PER_PAGE: usize = 100;

/// Hard cap on pages fetched for one listing.
const MAX_PAGES: usize = 100;

/// Slack added on top of a quota wait; server reset timestamps have
/// one-second resolution.
const QUOTA_WAIT_SLACK: Duration = Duration::from_secs(1);

/// One fully-described remote operation (always a GET).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Rate-limit bookkeeping parsed from response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitInfo {
    /// Requests left in the current quota window.
    pub remaining: Option<u32>,
    /// When the quota window resets.
    pub reset_at: Option<DateTime<Utc>>,
    /// Explicit server instruction to back off (`Retry-After`).
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        };

        Self {
            remaining: parse("x-ratelimit-remaining").map(|v| v as u32),
            reset_at: parse("x-ratelimit-reset")
                .and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0)),
            retry_after: parse("retry-after").map(Duration::from_secs),
        }
    }

    /// How long the server asks us to wait, preferring the explicit
    /// `Retry-After` over the window reset timestamp.
    pub fn reset_hint(&self) -> Option<Duration> {
        self.retry_after.or_else(|| {
            self.reset_at
                .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
        })
    }
}

/// Raw transport response before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub rate_limit: RateLimitInfo,
}

/// Transport seam: executes exactly one HTTP attempt.
///
/// Failures that never produced a status code (connect errors, timeouts)
/// are reported as [`ApiError::Transient`]; anything with a status comes
/// back as a [`RawResponse`] for classification.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError>;
}

/// reqwest-backed transport. The per-request timeout is configured on the
/// underlying `reqwest::Client`.
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl ReqwestTransport {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            headers: Vec::new(),
        }
    }

    /// Attach a header to every request (authorization and the like).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.get(&url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            body,
            rate_limit,
        })
    }
}

/// Last observed quota state, shared across calls to one remote API.
#[derive(Debug, Clone, Copy, Default)]
struct QuotaState {
    remaining: Option<u32>,
    reset_at: Option<DateTime<Utc>>,
}

/// Classified, retrying client over one remote API.
pub struct RateLimitedClient<T> {
    transport: T,
    retry: RetryPolicy,
    quota: QuotaPolicy,
    state: Mutex<QuotaState>,
}

impl<T: HttpTransport> RateLimitedClient<T> {
    pub fn new(transport: T, retry: RetryPolicy, quota: QuotaPolicy) -> Self {
        Self {
            transport,
            retry,
            quota,
            state: Mutex::new(QuotaState::default()),
        }
    }

    /// Execute one logical call, decoding the payload as `R`.
    pub async fn call<R: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<R, ApiError> {
        let body = self.call_raw(request, cancel).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch every page of a listing. Stops on an empty or short page, with
    /// a hard cap of [`MAX_PAGES`].
    pub async fn call_paginated<R: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<R>, ApiError> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let paged = request
                .clone()
                .query("per_page", PER_PAGE)
                .query("page", page);
            let items: Vec<R> = self.call(&paged, cancel).await?;
            let last_page = items.len() < PER_PAGE;
            all.extend(items);
            if last_page {
                break;
            }
        }
        Ok(all)
    }

    /// Fetch a paginated listing, falling back to `fallback` exactly once
    /// if the primary endpoint answers forbidden. The fallback call gets a
    /// fresh retry budget of its own; its outcome, success or failure, is
    /// the result.
    pub async fn call_paginated_with_fallback<R: DeserializeOwned>(
        &self,
        primary: &ApiRequest,
        fallback: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<R>, ApiError> {
        match self.call_paginated(primary, cancel).await {
            Err(ApiError::Forbidden { message }) => {
                tracing::warn!(
                    primary = %primary.path,
                    fallback = %fallback.path,
                    %message,
                    "endpoint forbidden, falling back"
                );
                self.call_paginated(fallback, cancel).await
            }
            other => other,
        }
    }

    async fn call_raw(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            self.wait_for_quota().await;

            let err = match self.attempt(request).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.retry.max_attempts {
                return Err(err);
            }

            let delay = self.backoff_delay(attempt, err.reset_hint());
            tracing::debug!(
                path = %request.path,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<String, ApiError> {
        let raw = self.transport.execute(request).await?;
        self.record_quota(raw.rate_limit);
        classify(raw)
    }

    /// Delay before the next attempt, after `completed` attempts. A server
    /// reset hint overrides the computed backoff outright: never retry
    /// before the window the server named.
    fn backoff_delay(&self, completed: u32, reset_hint: Option<Duration>) -> Duration {
        if let Some(hint) = reset_hint {
            return hint;
        }
        let exp = completed.saturating_sub(1).min(16);
        let computed = self.retry.base_delay.saturating_mul(2u32.saturating_pow(exp));
        let jitter = self
            .retry
            .base_delay
            .mul_f64(rand::thread_rng().gen::<f64>());
        (computed + jitter).min(self.retry.max_delay)
    }

    fn record_quota(&self, info: RateLimitInfo) {
        if info.remaining.is_none() && info.reset_at.is_none() {
            return;
        }
        let mut state = self.state.lock().expect("quota state poisoned");
        if info.remaining.is_some() {
            state.remaining = info.remaining;
        }
        if info.reset_at.is_some() {
            state.reset_at = info.reset_at;
        }
    }

    /// Wait out the quota window when the remote reported the pool as
    /// nearly exhausted, instead of spending retries on 429s.
    async fn wait_for_quota(&self) {
        let wait = {
            let mut state = self.state.lock().expect("quota state poisoned");
            match (state.remaining, state.reset_at) {
                (Some(remaining), Some(reset_at)) if remaining < self.quota.threshold => {
                    // Observed state is consumed by this wait; the next
                    // response refreshes it.
                    state.remaining = None;
                    (reset_at - Utc::now()).to_std().ok()
                }
                _ => None,
            }
        };

        if let Some(until_reset) = wait {
            if until_reset > Duration::ZERO {
                let wait = (until_reset + QUOTA_WAIT_SLACK).min(self.quota.max_wait);
                tracing::warn!(wait_secs = wait.as_secs(), "rate limit low, waiting for reset");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

/// Classify a raw response per the retry taxonomy.
fn classify(raw: RawResponse) -> Result<String, ApiError> {
    match raw.status {
        200..=299 => Ok(raw.body),
        429 => Err(ApiError::RateLimited {
            reset_hint: raw.rate_limit.reset_hint(),
        }),
        // A 403 with the quota reported as exhausted, or carrying an
        // explicit Retry-After, is rate limiting in disguise.
        403 if raw.rate_limit.remaining == Some(0) || raw.rate_limit.retry_after.is_some() => {
            Err(ApiError::RateLimited {
                reset_hint: raw.rate_limit.reset_hint(),
            })
        }
        401 | 403 => Err(ApiError::Forbidden {
            message: truncate(&raw.body),
        }),
        500..=599 => Err(ApiError::Transient(format!(
            "server error {}",
            raw.status
        ))),
        status => Err(ApiError::Fatal {
            status,
            message: truncate(&raw.body),
        }),
    }
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i <= LIMIT)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    }
}
