//! Gala Worker Library
//!
//! Pulls jobs from the shared queue with bounded concurrency and dispatches
//! them to the handler context provided by the application.

pub mod context;
pub mod queue;

pub use context::JobHandlerContext;
pub use queue::{JobQueue, JobQueueConfig, JOB_NOTIFY_CHANNEL};
