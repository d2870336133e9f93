//! Configuration module
//!
//! Environment-based configuration for the ingestion worker: storage, document
//! store, worker pool, scanner tiers, AI providers, and OCR. API keys are
//! optional throughout; an absent key means "provider not configured", never
//! an error at startup.

use std::env;

// Defaults
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_RETRIES: i32 = 3;
const DEFAULT_OCR_MAX_PAGES: usize = 5;

/// Worker pool configuration.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub job_timeout_secs: u64,
    pub max_retries: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Application configuration for the ingestion worker.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Document store
    pub database_url: Option<String>,
    // Blob storage
    pub storage_backend: String,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    // Scratch space for per-job temp files
    pub scratch_dir: Option<String>,
    // Worker pool
    pub worker: WorkerConfig,
    // Tier-1 cloud scanning service
    pub cloud_scan_url: Option<String>,
    pub cloud_scan_api_key: Option<String>,
    // AI metadata providers, in priority order when configured
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    // OCR fallback for image-only PDFs
    pub tesseract_path: String,
    pub ocr_language: String,
    pub ocr_max_pages: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self {
            environment: env_or("ENVIRONMENT", "development"),
            database_url: env::var("DATABASE_URL").ok(),
            storage_backend: env_or("STORAGE_BACKEND", "local"),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            scratch_dir: env::var("SCRATCH_DIR").ok(),
            worker: WorkerConfig {
                max_workers: parse_env_or("WORKER_MAX_WORKERS", DEFAULT_MAX_WORKERS)?,
                poll_interval_ms: parse_env_or("WORKER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
                job_timeout_secs: parse_env_or("WORKER_JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT_SECS)?,
                max_retries: parse_env_or("WORKER_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            },
            cloud_scan_url: env::var("CLOUD_SCAN_URL").ok(),
            cloud_scan_api_key: env::var("CLOUD_SCAN_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-3-5-haiku-20241022"),
            tesseract_path: env_or("TESSERACT_PATH", "tesseract"),
            ocr_language: env_or("OCR_LANGUAGE", "eng"),
            ocr_max_pages: parse_env_or("OCR_MAX_PAGES", DEFAULT_OCR_MAX_PAGES)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend.as_str() {
            "local" => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_PATH is required when STORAGE_BACKEND=local");
                }
            }
            "s3" => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET is required when STORAGE_BACKEND=s3");
                }
            }
            other => anyhow::bail!("unknown STORAGE_BACKEND: {} (expected local or s3)", other),
        }

        if self.worker.max_workers == 0 {
            anyhow::bail!("WORKER_MAX_WORKERS must be at least 1");
        }

        if self.cloud_scan_url.is_some() && self.cloud_scan_api_key.is_none() {
            anyhow::bail!("CLOUD_SCAN_API_KEY is required when CLOUD_SCAN_URL is set");
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    /// Cloud scanning is enabled only when both URL and key are configured.
    pub fn cloud_scan_enabled(&self) -> bool {
        self.cloud_scan_url.is_some() && self.cloud_scan_api_key.is_some()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "test".to_string(),
            database_url: None,
            storage_backend: "local".to_string(),
            local_storage_path: Some("/tmp/paperdock".to_string()),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            scratch_dir: None,
            worker: WorkerConfig::default(),
            cloud_scan_url: None,
            cloud_scan_api_key: None,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-5-haiku-20241022".to_string(),
            tesseract_path: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            ocr_max_pages: 5,
        }
    }

    #[test]
    fn local_backend_requires_path() {
        let mut config = base_config();
        assert!(config.validate().is_ok());
        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let mut config = base_config();
        config.storage_backend = "s3".to_string();
        assert!(config.validate().is_err());
        config.s3_bucket = Some("docs".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = base_config();
        config.storage_backend = "ftp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn cloud_scan_needs_both_url_and_key() {
        let mut config = base_config();
        assert!(!config.cloud_scan_enabled());
        config.cloud_scan_url = Some("https://scan.example.com".to_string());
        assert!(config.validate().is_err());
        config.cloud_scan_api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
        assert!(config.cloud_scan_enabled());
    }

    #[test]
    fn zero_workers_rejected() {
        let mut config = base_config();
        config.worker.max_workers = 0;
        assert!(config.validate().is_err());
    }
}
