//! Job dispatch: the worker pool calls back into application state here.

pub mod media_handler;

use async_trait::async_trait;
use gala_core::models::{Job, JobType};
use gala_core::JobError;
use gala_worker::JobHandlerContext;
use std::sync::Arc;

use crate::state::AppState;
use self::media_handler::MediaJobHandler;

#[async_trait]
impl JobHandlerContext for AppState {
    async fn dispatch_job(self: Arc<Self>, job: &Job) -> Result<serde_json::Value, JobError> {
        match job.job_type {
            JobType::ProcessMedia => MediaJobHandler::process(job, self).await,
        }
    }
}
