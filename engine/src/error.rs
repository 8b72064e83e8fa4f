//! Unified error types for the DevPulse engine
//!
//! This module defines error types for each layer:
//! - `ApiError`: classified outcome of a single remote call
//! - `JobError`: terminal cause recorded for a failed fetch job
//! - `BatchError`: orchestrator input contract violations
//! - `StorageError`: reported by the storage collaborator

use std::time::Duration;

use thiserror::Error;

use crate::domain::entities::{FetchStage, SourceId};

/// Classified failure of one remote API call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Quota exhausted. Retry no earlier than the server-provided hint.
    #[error("rate limited")]
    RateLimited { reset_hint: Option<Duration> },

    /// Access denied for reasons unrelated to rate limiting.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Network-level or 5xx failure, eligible for retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Non-retryable client error.
    #[error("API error: {status} - {message}")]
    Fatal { status: u16, message: String },

    /// 2xx response whose body did not decode as the expected entity.
    #[error("decode error: {0}")]
    Decode(String),

    /// The call observed a cancelled batch before completing.
    #[error("cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. } | ApiError::Transient(_))
    }

    /// Server-provided wait hint, when the failure carried one.
    pub fn reset_hint(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { reset_hint } => *reset_hint,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        // Anything that failed before a status code was produced is
        // network-level: connect errors, timeouts, broken bodies.
        ApiError::Transient(e.to_string())
    }
}

/// Terminal cause recorded for a failed fetch job.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// A pipeline stage exhausted its retries or hit a fatal response.
    #[error("{stage} fetch failed: {source}")]
    Stage {
        stage: FetchStage,
        #[source]
        source: ApiError,
    },

    /// The identifier could not be interpreted for the batch's source kind.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(SourceId),

    /// The batch was cancelled before this job completed.
    #[error("cancelled")]
    Cancelled,
}

impl JobError {
    /// Attach the failing stage to a call error, preserving cancellation.
    pub fn at_stage(stage: FetchStage, source: ApiError) -> Self {
        match source {
            ApiError::Cancelled => JobError::Cancelled,
            source => JobError::Stage { stage, source },
        }
    }
}

/// Contract violations on orchestrator input. Individual job failures are
/// never reported this way; they land in the batch result instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch contains no identifiers")]
    EmptyBatch,

    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,
}

/// Failure reported by the storage collaborator.
#[derive(Debug, Error)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);
