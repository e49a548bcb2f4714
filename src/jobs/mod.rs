//! Batch job orchestration and durable job state.
//!
//! One `BatchService` per process: an unbounded queue feeding a single
//! worker task, a JSON-backed `JobStore` for status and results, and
//! per-job cooperative cancellation.

mod service;
mod store;

pub use service::BatchService;
pub use store::JobStore;

use thiserror::Error;

/// Caller-facing errors from job operations.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job {0} is not completed")]
    NotCompleted(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
