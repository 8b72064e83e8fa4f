//! DevPulse engine
//!
//! Aggregation engine for development-activity dashboards: fetches
//! repository graphs from a code host and project graphs from a tracker
//! under bounded concurrency with retry/backoff, streams progress to any
//! number of subscribers, and computes derived metrics over the results.
//! Uses hexagonal (ports & adapters) architecture for clean separation of
//! concerns.
//!
//! The engine is a library with no listener of its own: callers invoke
//! [`FetchOrchestrator::run`] and the [`app::analytics_service`] functions
//! directly. Persistence and event transport are collaborators behind the
//! [`domain::ports`] traits and the [`progress`] bus.

pub mod adapters;
pub mod app;
pub mod cancel;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod progress;

#[cfg(test)]
mod test_utils;


pub use app::{BatchResult, BatchSummary, FetchOrchestrator};
pub use cancel::CancellationToken;
pub use config::{ClientConfig, FetchConfig, QuotaPolicy, RetryPolicy};
pub use error::{ApiError, BatchError, JobError, StorageError};
pub use progress::{BatchId, ProgressBus, ProgressEvent, ProgressPayload, ProgressSubscriber};
