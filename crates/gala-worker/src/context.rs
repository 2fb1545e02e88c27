//! Job handler context trait
//!
//! The application implements this trait for its state. The worker holds a
//! weak reference and calls `dispatch_job` when processing a claimed job;
//! the implementation matches on job type and invokes the right handler.

use async_trait::async_trait;
use std::sync::Arc;

use gala_core::models::Job;
use gala_core::JobError;

/// Context for job dispatch.
#[async_trait]
pub trait JobHandlerContext: Send + Sync {
    /// Dispatch a job to the appropriate handler and return its result.
    async fn dispatch_job(self: Arc<Self>, job: &Job) -> Result<serde_json::Value, JobError>;
}
