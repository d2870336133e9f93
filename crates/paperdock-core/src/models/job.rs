//! Ingestion job message.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One queued unit of work: process the document whose upload completed.
///
/// Delivered at-least-once by the job queue; `retry_count` is owned by the
/// queue and incremented on each redelivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub document_id: Uuid,
    /// Key of the uploaded source file in the blob store.
    pub blob_key: String,
    #[serde(default)]
    pub retry_count: i32,
}

impl IngestJob {
    pub fn new(document_id: Uuid, blob_key: impl Into<String>) -> Self {
        Self {
            document_id,
            blob_key: blob_key.into(),
            retry_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_count_defaults_to_zero_on_deserialize() {
        let json = format!(
            r#"{{"document_id":"{}","blob_key":"uploads/a.pdf"}}"#,
            Uuid::new_v4()
        );
        let job: IngestJob = serde_json::from_str(&json).unwrap();
        assert_eq!(job.retry_count, 0);
    }
}
