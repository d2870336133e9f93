//! Ingestion job error types.
//!
//! Lets pipeline stages indicate whether a failure is retryable (the queue
//! should redeliver the job) or permanent (mark the document failed and stop).

use std::fmt;

/// An ingestion failure that is either retryable or permanent.
#[derive(Debug)]
pub struct IngestError {
    inner: anyhow::Error,
    retryable: bool,
}

impl IngestError {
    /// Create a permanent error.
    ///
    /// Permanent errors fail the job immediately without retrying. Used for
    /// conditions that will not change on redelivery: a missing document
    /// record, or an unclean virus-scan verdict.
    pub fn permanent(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: false,
        }
    }

    /// Create a retryable error.
    ///
    /// Retryable errors are redelivered according to the queue's retry
    /// policy: transient network failures, a busy OCR backend, an AI
    /// provider blip.
    pub fn retryable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: true,
        }
    }

    /// Whether the queue should retry this job.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for IngestError {
    /// Default conversion treats the error as retryable.
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(err)
    }
}

/// Extension trait for marking a Result permanent on error.
pub trait IngestResultExt<T> {
    fn permanent(self) -> Result<T, IngestError>;
}

impl<T, E: Into<anyhow::Error>> IngestResultExt<T> for Result<T, E> {
    fn permanent(self) -> Result<T, IngestError> {
        self.map_err(|e| IngestError::permanent(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_error_is_not_retryable() {
        let err = IngestError::permanent(anyhow::anyhow!("document not found"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("document not found"));
    }

    #[test]
    fn retryable_error_is_retryable() {
        let err = IngestError::retryable(anyhow::anyhow!("network timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn from_anyhow_defaults_to_retryable() {
        let err: IngestError = anyhow::anyhow!("some error").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn result_ext_marks_permanent() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("unclean scan"));
        let ingest_result = result.permanent();
        assert!(!ingest_result.unwrap_err().is_retryable());
    }

    #[test]
    fn downcast_through_anyhow_preserves_flag() {
        let err: anyhow::Error = IngestError::permanent(anyhow::anyhow!("bad")).into();
        let retryable = err
            .downcast_ref::<IngestError>()
            .map(|e| e.is_retryable())
            .unwrap_or(true);
        assert!(!retryable);
    }
}
