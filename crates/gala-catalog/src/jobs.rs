//! Job queue persistence.
//!
//! Jobs live in Postgres; claiming uses FOR UPDATE SKIP LOCKED so concurrent
//! workers never double-claim, and an insert trigger NOTIFYs the worker pool.

use chrono::{Duration, Utc};
use gala_core::models::{Job, JobType};
use gala_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str = r#"
    id, job_type, status, payload, result, scheduled_at, started_at,
    completed_at, retry_count, max_retries, timeout_seconds,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending job. At-least-once: duplicate submissions for the
    /// same media record are allowed and deduplicated by the worker's
    /// idempotency guard, not here.
    pub async fn create_job(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        max_retries: i32,
        timeout_seconds: Option<i32>,
    ) -> Result<Job, AppError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (job_type, payload, max_retries, timeout_seconds)
            VALUES ($1, $2, $3, $4)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job_type.to_string())
        .bind(payload)
        .bind(max_retries)
        .bind(timeout_seconds)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    /// Atomically claim the next due job, if any.
    pub async fn claim_next_job(&self) -> Result<Option<Job>, AppError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'running', started_at = now(), updated_at = now()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status IN ('pending', 'scheduled') AND scheduled_at <= now()
                ORDER BY scheduled_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        result: serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', result = $2, completed_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Dead-letter: park the job with its terminal error recorded. No further
    /// automatic retries; an operator (or the catalog) re-enqueues explicitly.
    pub async fn mark_failed(&self, id: Uuid, error: serde_json::Value) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', result = $2, completed_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Schedule the next attempt after a recoverable failure.
    pub async fn reschedule_retry(&self, id: Uuid, backoff_secs: u64) -> Result<Job, AppError> {
        let scheduled_at = Utc::now() + Duration::seconds(backoff_secs as i64);
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'scheduled', retry_count = retry_count + 1,
                scheduled_at = $2, updated_at = now()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }
}
