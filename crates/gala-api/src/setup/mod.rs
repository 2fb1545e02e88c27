//! Application initialization: database, storage, queue, and routes.

pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use axum::Router;
use gala_catalog::{EventRepository, JobRepository, MediaRepository};
use gala_core::Config;
use gala_storage::create_storage;
use gala_worker::{JobHandlerContext, JobQueue, JobQueueConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    let events = EventRepository::new(pool.clone());
    let media = MediaRepository::new(pool.clone());
    let jobs = JobRepository::new(pool.clone());

    let queue_config = JobQueueConfig {
        max_workers: config.job_queue_max_workers,
        poll_interval_ms: config.job_queue_poll_interval_ms,
        max_retries: config.job_queue_max_retries,
        retry_backoff_secs: config.job_retry_backoff_secs,
        job_timeout_seconds: config.job_timeout_seconds,
    };

    // The queue dispatches back into AppState, and AppState owns the queue;
    // new_cyclic ties the knot with a weak reference so shutdown can drop
    // the state without the worker keeping it alive.
    let state = Arc::new_cyclic(|weak: &Weak<AppState>| {
        let context: Weak<dyn JobHandlerContext> = weak.clone();
        let queue = JobQueue::new(jobs.clone(), queue_config, context, Some(pool.clone()));
        AppState {
            config: config.clone(),
            pool: pool.clone(),
            events,
            media,
            storage,
            queue,
        }
    });

    tracing::info!(
        storage_backend = %config.storage_backend,
        workers = config.job_queue_max_workers,
        "Application initialized"
    );

    let router = routes::build_router(state.clone(), &config)?;

    Ok((state, router))
}
