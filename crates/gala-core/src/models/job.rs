//! Background job model for the processing queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ProcessMedia,
}

impl Display for JobType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobType::ProcessMedia => write!(f, "process_media"),
        }
    }
}

impl FromStr for JobType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process_media" => Ok(JobType::ProcessMedia),
            _ => Err(anyhow::anyhow!("Invalid job type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    /// Terminal: the job exhausted its retries (or failed unrecoverably) and
    /// is parked with its error recorded, awaiting operator intervention.
    Failed,
    /// Waiting for its backoff delay before the next attempt.
    Scheduled,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Job {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Job {
            id: row.get("id"),
            job_type: row.get::<String, _>("job_type").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse job_type: {}", e).into())
            })?,
            status: row.get("status"),
            payload: row.get("payload"),
            result: row.get("result"),
            scheduled_at: row.get("scheduled_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            timeout_seconds: row.get("timeout_seconds"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Job {
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Extract the payload as a typed struct, returning an error on failure.
    pub fn try_payload_as<P: JobPayload>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Create a payload value from a typed struct.
    pub fn payload_from<P: JobPayload>(payload: &P) -> serde_json::Value {
        serde_json::to_value(payload).unwrap_or_default()
    }
}

/// Trait for type-safe job payloads
pub trait JobPayload: Serialize + for<'de> Deserialize<'de> {
    fn job_type() -> JobType;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMediaPayload {
    pub media_id: Uuid,
}

impl JobPayload for ProcessMediaPayload {
    fn job_type() -> JobType {
        JobType::ProcessMedia
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(retry_count: i32, max_retries: i32) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: JobType::ProcessMedia,
            status: JobStatus::Running,
            payload: serde_json::json!({}),
            result: None,
            scheduled_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count,
            max_retries,
            timeout_seconds: Some(600),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_job_type_round_trip() {
        assert_eq!(JobType::ProcessMedia.to_string(), "process_media");
        assert_eq!(
            "process_media".parse::<JobType>().unwrap(),
            JobType::ProcessMedia
        );
        assert!("unknown_job".parse::<JobType>().is_err());
    }

    #[test]
    fn test_can_retry_under_limit() {
        assert!(job(2, 3).can_retry());
    }

    #[test]
    fn test_cannot_retry_at_limit() {
        assert!(!job(3, 3).can_retry());
    }

    #[test]
    fn test_typed_payload_round_trip() {
        let media_id = Uuid::new_v4();
        let payload = ProcessMediaPayload { media_id };
        let mut j = job(0, 3);
        j.payload = Job::payload_from(&payload);
        let parsed: ProcessMediaPayload = j.try_payload_as().unwrap();
        assert_eq!(parsed.media_id, media_id);
    }
}
