//! Job queue: worker pool, LISTEN/NOTIFY wakeup, polling, retry, submission.
//!
//! Shutdown: [`JobQueue::shutdown`] signals the pool to stop claiming; it
//! does not wait for in-flight jobs. For graceful shutdown, allow time for
//! running jobs to finish before process exit.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

use gala_catalog::JobRepository;
use gala_core::models::{Job, JobPayload};

use crate::context::JobHandlerContext;

/// Channel name for PostgreSQL LISTEN/NOTIFY when a new job is created.
pub const JOB_NOTIFY_CHANNEL: &str = "gala_new_job";

/// Maximum delay in seconds before retrying a failed job. Caps exponential
/// backoff so high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds for a given retry count: exponential from the base
/// delay, capped.
#[inline]
pub(crate) fn compute_retry_backoff_seconds(base_secs: u64, retry_count: i32) -> u64 {
    base_secs
        .saturating_mul(1_u64 << retry_count.clamp(0, 32) as u32)
        .min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct JobQueueConfig {
    /// Bound on concurrent in-flight jobs. This is the primary backpressure
    /// mechanism: the queue may grow unboundedly, but decode buffers and
    /// encoder subprocesses stay capped.
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub max_retries: i32,
    /// First retry delay; subsequent retries double it.
    pub retry_backoff_secs: u64,
    pub job_timeout_seconds: i32,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            poll_interval_ms: 1000,
            max_retries: 3,
            retry_backoff_secs: 3,
            job_timeout_seconds: 600,
        }
    }
}

pub struct JobQueue {
    repository: JobRepository,
    config: JobQueueConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl JobQueue {
    /// Create a new JobQueue with a weak reference to the dispatch context.
    ///
    /// If `pool` is `Some`, the worker uses PostgreSQL LISTEN/NOTIFY to wake
    /// immediately when jobs are created, in addition to polling at
    /// `poll_interval_ms`. If `pool` is `None`, only polling is used.
    pub fn new(
        repository: JobRepository,
        config: JobQueueConfig,
        context: Weak<dyn JobHandlerContext>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let repo_clone = repository.clone();
        let config_clone = config.clone();

        tokio::spawn(async move {
            Self::worker_pool(repo_clone, config_clone, context, shutdown_rx, pool).await;
        });

        Self {
            repository,
            config,
            shutdown_tx,
        }
    }

    /// Submit a typed job to the queue with the configured retry budget.
    #[tracing::instrument(skip(self, payload))]
    pub async fn submit<P: JobPayload>(&self, payload: &P) -> Result<Uuid> {
        let job = self
            .repository
            .create_job(
                P::job_type(),
                Job::payload_from(payload),
                self.config.max_retries,
                Some(self.config.job_timeout_seconds),
            )
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create job in repository: {}", e))?;

        tracing::info!(
            job_id = %job.id,
            job_type = %P::job_type(),
            "Job submitted to queue"
        );

        Ok(job.id)
    }

    async fn worker_pool(
        repository: JobRepository,
        config: JobQueueConfig,
        context: Weak<dyn JobHandlerContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "Job queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Channel to wake the main loop when LISTEN receives a NOTIFY
        // (avoids blocking on recv when no pool is available).
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(JOB_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Job queue worker pool shutting down");
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&repository, &config, &semaphore, &context).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &config, &semaphore, &context).await;
                }
            }
        }

        tracing::info!("Job queue worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &JobRepository,
        config: &JobQueueConfig,
        semaphore: &Arc<Semaphore>,
        context: &Weak<dyn JobHandlerContext>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next_job().await {
            Ok(Some(job)) => {
                let repo = repository.clone();
                let cfg = config.clone();
                let ctx = context.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Self::process_job_with_retry(job, repo, cfg, ctx).await {
                        tracing::error!(error = %e, "Job processing failed after retries");
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim job from queue");
            }
        }
    }

    #[tracing::instrument(skip(repository, config, context), fields(job.id = %job.id, job.job_type = %job.job_type))]
    async fn process_job_with_retry(
        job: Job,
        repository: JobRepository,
        config: JobQueueConfig,
        context: Weak<dyn JobHandlerContext>,
    ) -> Result<()> {
        let ctx = context
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("JobHandlerContext was dropped, cannot process job"))?;

        let timeout_duration = job
            .timeout_seconds
            .map(|s| Duration::from_secs(s as u64))
            .unwrap_or(Duration::from_secs(config.job_timeout_seconds as u64));

        let result = tokio::time::timeout(timeout_duration, ctx.dispatch_job(&job)).await;

        match result {
            Ok(Ok(job_result)) => {
                repository
                    .mark_completed(job.id, job_result)
                    .await
                    .context("Failed to mark job as completed")?;
                tracing::info!(job_id = %job.id, job_type = %job.job_type, "Job completed successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                let unrecoverable = !e.is_recoverable();

                tracing::error!(
                    job_id = %job.id,
                    error = %e,
                    retry_count = job.retry_count,
                    max_retries = job.max_retries,
                    unrecoverable = unrecoverable,
                    "Job execution failed"
                );

                // Validation-style failures cannot succeed on retry:
                // dead-letter immediately.
                if unrecoverable {
                    let error_result = json!({
                        "error": e.to_string(),
                        "retry_count": job.retry_count,
                        "unrecoverable": true,
                    });
                    repository
                        .mark_failed(job.id, error_result)
                        .await
                        .context("Failed to mark job as failed")?;
                    tracing::error!(job_id = %job.id, "Job dead-lettered (unrecoverable error)");
                    return Err(e.into_inner());
                }

                if job.can_retry() {
                    let backoff_seconds =
                        compute_retry_backoff_seconds(config.retry_backoff_secs, job.retry_count);
                    tracing::info!(
                        job_id = %job.id,
                        retry_count = job.retry_count + 1,
                        backoff_seconds = backoff_seconds,
                        "Scheduling job retry"
                    );
                    repository.reschedule_retry(job.id, backoff_seconds).await?;
                    Ok(())
                } else {
                    let error_result = json!({
                        "error": e.to_string(),
                        "retry_count": job.retry_count,
                        "reason": "Job failed after maximum retries",
                    });
                    repository
                        .mark_failed(job.id, error_result)
                        .await
                        .context("Failed to mark job as failed")?;
                    tracing::error!(job_id = %job.id, "Job dead-lettered after max retries");
                    Err(e.into_inner())
                }
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job.id,
                    timeout_seconds = ?job.timeout_seconds,
                    "Job execution timed out"
                );
                if job.can_retry() {
                    let backoff_seconds =
                        compute_retry_backoff_seconds(config.retry_backoff_secs, job.retry_count);
                    repository.reschedule_retry(job.id, backoff_seconds).await?;
                    Ok(())
                } else {
                    let error_result = json!({
                        "error": "Job execution timed out",
                        "timeout_seconds": job.timeout_seconds,
                    });
                    repository.mark_failed(job.id, error_result).await?;
                    Err(anyhow::anyhow!("Job execution timed out"))
                }
            }
        }
    }

    /// Signals the worker pool to stop claiming new jobs and exit its loop.
    ///
    /// Returns immediately after sending the signal; already-spawned job
    /// handlers continue running until they complete or time out.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating job queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl Clone for JobQueue {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gala_core::JobError;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(3, 0), 3);
        assert_eq!(compute_retry_backoff_seconds(3, 1), 6);
        assert_eq!(compute_retry_backoff_seconds(3, 2), 12);
        assert_eq!(compute_retry_backoff_seconds(3, 6), 192);
        assert_eq!(compute_retry_backoff_seconds(3, 7), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(3, 30), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn backoff_handles_negative_retry_count() {
        assert_eq!(compute_retry_backoff_seconds(3, -1), 3);
    }

    #[test]
    fn unrecoverable_job_error_detected() {
        let err = JobError::unrecoverable(anyhow::anyhow!("image too small"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn recoverable_job_error_detected() {
        let err = JobError::recoverable(anyhow::anyhow!("storage timeout"));
        assert!(err.is_recoverable());
    }
}
