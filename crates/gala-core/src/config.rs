//! Configuration module
//!
//! Environment-driven configuration for the API and the background worker,
//! loaded once at process start and passed down explicitly.

use std::env;

use crate::constants;
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JOB_QUEUE_MAX_WORKERS: usize = 3;
const DEFAULT_JOB_QUEUE_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_JOB_QUEUE_MAX_RETRIES: i32 = 3;
const DEFAULT_JOB_RETRY_BACKOFF_SECS: u64 = 3;
const DEFAULT_JOB_TIMEOUT_SECS: i32 = 600;

/// Application configuration for the API server and worker pool.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    /// Public CDN/base URL for serving derived artifacts. When unset, S3
    /// object URLs are derived from bucket and region.
    pub public_base_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub upload_url_ttl_secs: u64,
    // Media processing
    pub max_video_duration_sec: u32,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    // Job queue
    pub job_queue_max_workers: usize,
    pub job_queue_poll_interval_ms: u64,
    pub job_queue_max_retries: i32,
    pub job_retry_backoff_secs: u64,
    pub job_timeout_seconds: i32,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        let config = Config {
            server_port: env_parse("PORT", DEFAULT_PORT),
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|s| !s.is_empty()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            upload_url_ttl_secs: env_parse("UPLOAD_URL_TTL_SECS", constants::UPLOAD_URL_TTL_SECS),
            max_video_duration_sec: env_parse(
                "MAX_VIDEO_DURATION_SEC",
                constants::MAX_VIDEO_DURATION_SEC,
            ),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            job_queue_max_workers: env_parse(
                "JOB_QUEUE_MAX_WORKERS",
                DEFAULT_JOB_QUEUE_MAX_WORKERS,
            ),
            job_queue_poll_interval_ms: env_parse(
                "JOB_QUEUE_POLL_INTERVAL_MS",
                DEFAULT_JOB_QUEUE_POLL_INTERVAL_MS,
            ),
            job_queue_max_retries: env_parse(
                "JOB_QUEUE_MAX_RETRIES",
                DEFAULT_JOB_QUEUE_MAX_RETRIES,
            ),
            job_retry_backoff_secs: env_parse(
                "JOB_RETRY_BACKOFF_SECS",
                DEFAULT_JOB_RETRY_BACKOFF_SECS,
            ),
            job_timeout_seconds: env_parse("JOB_TIMEOUT_SECONDS", DEFAULT_JOB_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            environment: "development".to_string(),
            database_url: "postgresql://localhost/gala".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            storage_backend: StorageBackend::S3,
            s3_bucket: Some("gala-media".to_string()),
            s3_region: Some("auto".to_string()),
            s3_endpoint: None,
            public_base_url: None,
            local_storage_path: None,
            local_storage_base_url: None,
            upload_url_ttl_secs: 300,
            max_video_duration_sec: 15,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            job_queue_max_workers: 3,
            job_queue_poll_interval_ms: 1000,
            job_queue_max_retries: 3,
            job_retry_backoff_secs: 3,
            job_timeout_seconds: 600,
        }
    }

    #[test]
    fn valid_s3_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.s3_bucket = None;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.s3_region = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_backend_requires_path_and_base_url() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());

        config.local_storage_path = Some("/var/lib/gala/media".to_string());
        config.local_storage_base_url = Some("http://localhost:4000/media".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let mut config = base_config();
        config.environment = "production".to_string();
        config.cors_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_postgres_url_rejected() {
        let mut config = base_config();
        config.database_url = "mysql://localhost/gala".to_string();
        assert!(config.validate().is_err());
    }
}
