//! Hosted scanning service client (Tier 1).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use paperdock_core::constants::CLOUD_SCAN_MAX_BYTES;
use paperdock_core::models::{FileType, ScanRecord};

use super::{ScanError, Scanner};

const SCANNER_NAME: &str = "cloud-scan";

const MAX_POLL_ATTEMPTS: u32 = 15;
const POLL_BACKOFF_FACTOR: f64 = 1.5;
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Submits files to a hosted scanning API and polls for the analysis verdict.
///
/// The service caps submissions at 32 MB; larger files are rejected with
/// [`ScanError::TooLarge`] so the caller can route them to the local tier.
/// A verdict that never arrives within the polling budget is treated as
/// unclean and flagged for manual review rather than waved through.
pub struct CloudScanner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct SubmitResponse {
    scan_id: String,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    status: String,
    #[serde(default)]
    stats: AnalysisStats,
    #[serde(default)]
    threat_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct AnalysisStats {
    #[serde(default)]
    malicious: u32,
    #[serde(default)]
    suspicious: u32,
}

impl CloudScanner {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Override the initial poll interval. Used by tests.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn submit(&self, data: &[u8], filename: &str) -> Result<String, ScanError> {
        let response = self
            .client
            .post(format!("{}/scans", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("x-filename", filename)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| ScanError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScanError::Submission(format!(
                "service returned {}",
                response.status()
            )));
        }
        let submit: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ScanError::Submission(e.to_string()))?;
        Ok(submit.scan_id)
    }

    async fn poll(&self, scan_id: &str) -> Result<Option<AnalysisResponse>, ScanError> {
        let mut interval = self.poll_interval;
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            tokio::time::sleep(interval).await;
            interval = Duration::from_secs_f64(
                (interval.as_secs_f64() * POLL_BACKOFF_FACTOR)
                    .min(MAX_POLL_INTERVAL.as_secs_f64()),
            );

            let response = self
                .client
                .get(format!("{}/scans/{}", self.base_url, scan_id))
                .header("x-api-key", &self.api_key)
                .send()
                .await
                .map_err(|e| ScanError::Service(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ScanError::Service(format!(
                    "service returned {}",
                    response.status()
                )));
            }
            let analysis: AnalysisResponse = response
                .json()
                .await
                .map_err(|e| ScanError::Service(e.to_string()))?;

            if analysis.status == "completed" {
                debug!(scan_id, attempt, "scan analysis completed");
                return Ok(Some(analysis));
            }
            debug!(scan_id, attempt, status = %analysis.status, "scan still pending");
        }
        Ok(None)
    }
}

#[async_trait]
impl Scanner for CloudScanner {
    fn name(&self) -> &'static str {
        SCANNER_NAME
    }

    async fn scan(
        &self,
        data: &[u8],
        filename: &str,
        _file_type: FileType,
    ) -> Result<ScanRecord, ScanError> {
        if data.len() as i64 > CLOUD_SCAN_MAX_BYTES {
            return Err(ScanError::TooLarge {
                size: data.len() as i64,
                limit: CLOUD_SCAN_MAX_BYTES,
            });
        }

        let scan_id = self.submit(data, filename).await?;
        info!(scan_id, filename, bytes = data.len(), "submitted file for scanning");

        let Some(analysis) = self.poll(&scan_id).await? else {
            return Ok(ScanRecord::unclean(
                SCANNER_NAME,
                "verdict not available within the polling budget; flagged for manual review",
                "scan-timeout",
            ));
        };

        let stats = &analysis.stats;
        if stats.malicious > 0 || stats.suspicious > 2 {
            let threat = analysis
                .threat_name
                .unwrap_or_else(|| "unspecified-threat".to_string());
            return Ok(ScanRecord::unclean(
                SCANNER_NAME,
                format!(
                    "{} malicious, {} suspicious engine verdicts",
                    stats.malicious, stats.suspicious
                ),
                threat,
            ));
        }
        Ok(ScanRecord::clean(
            SCANNER_NAME,
            format!(
                "{} malicious, {} suspicious engine verdicts",
                stats.malicious, stats.suspicious
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scanner(server: &mockito::ServerGuard) -> CloudScanner {
        CloudScanner::new(server.url(), "test-key")
            .with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn clean_verdict_after_polling() {
        let mut server = mockito::Server::new_async().await;
        let submit = server
            .mock("POST", "/scans")
            .match_header("x-api-key", "test-key")
            .with_body(json!({"scan_id": "abc123"}).to_string())
            .create_async()
            .await;
        let completed = server
            .mock("GET", "/scans/abc123")
            .with_body(
                json!({"status": "completed", "stats": {"malicious": 0, "suspicious": 1}})
                    .to_string(),
            )
            .create_async()
            .await;

        let record = scanner(&server)
            .scan(b"%PDF-1.5 fine", "ok.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert!(record.clean);
        submit.assert_async().await;
        completed.assert_async().await;
    }

    #[tokio::test]
    async fn malicious_verdict_is_unclean() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scans")
            .with_body(json!({"scan_id": "bad1"}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/scans/bad1")
            .with_body(
                json!({
                    "status": "completed",
                    "stats": {"malicious": 3, "suspicious": 0},
                    "threat_name": "Trojan.GenericKD"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let record = scanner(&server)
            .scan(b"payload", "bad.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert!(!record.clean);
        assert_eq!(record.threat.as_deref(), Some("Trojan.GenericKD"));
    }

    #[tokio::test]
    async fn suspicious_above_threshold_is_unclean() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scans")
            .with_body(json!({"scan_id": "sus1"}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/scans/sus1")
            .with_body(
                json!({"status": "completed", "stats": {"malicious": 0, "suspicious": 3}})
                    .to_string(),
            )
            .create_async()
            .await;

        let record = scanner(&server)
            .scan(b"payload", "sus.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert!(!record.clean);
    }

    #[tokio::test]
    async fn polling_budget_exhaustion_flags_manual_review() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scans")
            .with_body(json!({"scan_id": "slow1"}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/scans/slow1")
            .with_body(json!({"status": "pending"}).to_string())
            .expect(MAX_POLL_ATTEMPTS as usize)
            .create_async()
            .await;

        let record = scanner(&server)
            .scan(b"payload", "slow.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert!(!record.clean);
        assert_eq!(record.threat.as_deref(), Some("scan-timeout"));
    }

    #[tokio::test]
    async fn oversize_file_is_rejected_before_submission() {
        let server = mockito::Server::new_async().await;
        let data = vec![0u8; (CLOUD_SCAN_MAX_BYTES + 1) as usize];
        let err = scanner(&server)
            .scan(&data, "huge.pdf", FileType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn submission_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/scans")
            .with_status(503)
            .create_async()
            .await;

        let err = scanner(&server)
            .scan(b"payload", "x.pdf", FileType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Submission(_)));
    }
}
