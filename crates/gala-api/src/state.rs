//! Application state shared by handlers and the worker pool.
//!
//! Queue and storage handles are injected here at startup rather than living
//! as module globals, so lifecycle (open at process start, stop on shutdown)
//! stays explicit.

use gala_catalog::{EventRepository, MediaRepository};
use gala_core::Config;
use gala_storage::Storage;
use gala_worker::JobQueue;
use sqlx::PgPool;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub events: EventRepository,
    pub media: MediaRepository,
    pub storage: Arc<dyn Storage>,
    pub queue: JobQueue,
}
