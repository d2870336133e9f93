//! Two-tier security scanning.
//!
//! Tier 1 ([`CloudScanner`]) submits the file to a hosted scanning service
//! and polls for a verdict. Tier 2 ([`SignatureScanner`]) is a local
//! signature and heuristic check with no external dependency.
//! [`FallbackScanner`] composes them: any Tier-1 error drops to Tier 2, so a
//! scanning outage degrades coverage instead of halting ingestion.

mod heuristic;
mod remote;

pub use heuristic::SignatureScanner;
pub use remote::CloudScanner;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use paperdock_core::models::{FileType, ScanRecord};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan submission rejected: {0}")]
    Submission(String),

    #[error("scanning service error: {0}")]
    Service(String),

    #[error("file of {size} bytes exceeds the {limit}-byte scan ceiling")]
    TooLarge { size: i64, limit: i64 },
}

/// A virus/malware scanner. An unclean verdict is a successful scan; errors
/// mean the scan itself could not run.
#[async_trait]
pub trait Scanner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn scan(
        &self,
        data: &[u8],
        filename: &str,
        file_type: FileType,
    ) -> Result<ScanRecord, ScanError>;
}

/// Tier-1 scanner with a local Tier-2 fallback. When no cloud scanner is
/// configured every file goes straight to the signature tier.
pub struct FallbackScanner {
    primary: Option<Arc<dyn Scanner>>,
    fallback: Arc<dyn Scanner>,
}

impl FallbackScanner {
    pub fn new(primary: Option<Arc<dyn Scanner>>, fallback: Arc<dyn Scanner>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Scanner for FallbackScanner {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn scan(
        &self,
        data: &[u8],
        filename: &str,
        file_type: FileType,
    ) -> Result<ScanRecord, ScanError> {
        if let Some(primary) = &self.primary {
            match primary.scan(data, filename, file_type).await {
                Ok(record) => return Ok(record),
                Err(e) => {
                    warn!(
                        scanner = primary.name(),
                        error = %e,
                        "primary scanner unavailable, using signature tier"
                    );
                }
            }
        }
        self.fallback.scan(data, filename, file_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingScanner;

    #[async_trait]
    impl Scanner for FailingScanner {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn scan(
            &self,
            _data: &[u8],
            _filename: &str,
            _file_type: FileType,
        ) -> Result<ScanRecord, ScanError> {
            Err(ScanError::Service("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn primary_error_falls_back_to_signature_tier() {
        let scanner = FallbackScanner::new(
            Some(Arc::new(FailingScanner)),
            Arc::new(SignatureScanner::new()),
        );
        let record = scanner
            .scan(b"%PDF-1.5 hello", "report.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert!(record.clean);
        assert_eq!(record.scanner, "signature-validation");
    }

    #[tokio::test]
    async fn no_primary_goes_straight_to_fallback() {
        let scanner = FallbackScanner::new(None, Arc::new(SignatureScanner::new()));
        let record = scanner
            .scan(b"%PDF-1.5 hello", "report.pdf", FileType::Pdf)
            .await
            .unwrap();
        assert_eq!(record.scanner, "signature-validation");
    }
}
