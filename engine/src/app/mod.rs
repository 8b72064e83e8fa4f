//! Application layer
//!
//! Batch fetch orchestration and analytics over completed snapshots.

pub mod analytics_service;
pub mod fetch_service;

pub use fetch_service::{BatchResult, BatchSummary, FetchOrchestrator};
