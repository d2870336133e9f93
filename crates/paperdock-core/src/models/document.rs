//! The Document record and its processing lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Category, FileType};

/// Lifecycle status of an uploaded document.
///
/// Transitions are monotonic except the takedown/restore pair, which is owned
/// by the moderation collaborator, not the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Quarantined,
    Rejected,
    TakenDown,
}

impl DocumentStatus {
    /// Whether this status permits the given transition.
    ///
    /// Terminal pipeline states only move via the moderation takedown/restore
    /// pair; `Failed` may re-enter `Processing` when the queue redelivers,
    /// and `Processing` may be re-claimed when a redelivery takes over a
    /// stale claim left by an abandoned attempt.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Uploaded, Processing)
                | (Processing, Processing)
                | (Processing, Processed)
                | (Processing, Failed)
                | (Processing, Quarantined)
                | (Processing, Rejected)
                | (Failed, Processing)
                | (Processed, TakenDown)
                | (TakenDown, Processed)
        )
    }

    /// Terminal states: no further pipeline-internal transition follows.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Processed
                | DocumentStatus::Failed
                | DocumentStatus::Quarantined
                | DocumentStatus::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Failed => "failed",
            DocumentStatus::Quarantined => "quarantined",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::TakenDown => "taken_down",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "processed" => Ok(DocumentStatus::Processed),
            "failed" => Ok(DocumentStatus::Failed),
            "quarantined" => Ok(DocumentStatus::Quarantined),
            "rejected" => Ok(DocumentStatus::Rejected),
            "taken_down" => Ok(DocumentStatus::TakenDown),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// Result of the security scan, recorded on the document for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub clean: bool,
    /// Identity of the scanner tier that produced the verdict.
    pub scanner: String,
    pub scanned_at: DateTime<Utc>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<String>,
}

impl ScanRecord {
    pub fn clean(scanner: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            clean: true,
            scanner: scanner.into(),
            scanned_at: Utc::now(),
            details: details.into(),
            threat: None,
        }
    }

    pub fn unclean(
        scanner: impl Into<String>,
        details: impl Into<String>,
        threat: impl Into<String>,
    ) -> Self {
        Self {
            clean: false,
            scanner: scanner.into(),
            scanned_at: Utc::now(),
            details: details.into(),
            threat: Some(threat.into()),
        }
    }
}

/// A shared document. The pipeline is the sole writer of the derived fields
/// while status is `Processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_filename: String,
    /// Key of the uploaded source file in the blob store.
    pub blob_key: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub status: DocumentStatus,

    // Derived fields, empty until the first successful processing run.
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: Category,
    pub page_count: Option<i32>,
    pub thumbnail_key: Option<String>,
    pub fingerprint: Option<String>,
    /// Free-form metadata bag: word count, language, readability, themes,
    /// extraction method.
    pub metadata: serde_json::Value,

    pub scan_result: Option<ScanRecord>,
    /// Set only when status is `Failed`.
    pub processing_error: Option<String>,

    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A freshly uploaded document with no derived fields.
    pub fn new_uploaded(
        owner_id: Uuid,
        original_filename: impl Into<String>,
        blob_key: impl Into<String>,
        file_type: FileType,
        file_size: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            original_filename: original_filename.into(),
            blob_key: blob_key.into(),
            file_type,
            file_size,
            status: DocumentStatus::Uploaded,
            title: None,
            description: None,
            tags: Vec::new(),
            category: Category::Other,
            page_count: None,
            thumbnail_key: None,
            fingerprint: None,
            metadata: serde_json::Value::Null,
            scan_result: None,
            processing_error: None,
            uploaded_at: now,
            updated_at: now,
        }
    }

    /// Viewable means processed and not taken down. Failed documents keep any
    /// partial fields for diagnostics but are never viewable.
    pub fn is_viewable(&self) -> bool {
        self.status == DocumentStatus::Processed
    }
}

/// All derived fields produced by one successful pipeline run, written to the
/// document store in a single update so readers never observe half-complete
/// metadata.
#[derive(Debug, Clone)]
pub struct ProcessingResults {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub page_count: i32,
    pub thumbnail_key: String,
    pub fingerprint: String,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new_uploaded(
            Uuid::new_v4(),
            "report.pdf",
            "uploads/abc/report.pdf",
            FileType::Pdf,
            1024,
        )
    }

    #[test]
    fn new_document_has_no_derived_fields() {
        let d = doc();
        assert_eq!(d.status, DocumentStatus::Uploaded);
        assert!(d.title.is_none());
        assert!(d.tags.is_empty());
        assert_eq!(d.category, Category::Other);
        assert!(d.page_count.is_none());
        assert!(!d.is_viewable());
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        use DocumentStatus::*;
        assert!(Uploaded.can_transition_to(Processing));
        // A redelivered job may take over a stale claim.
        assert!(Processing.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Processed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Processing));
        assert!(Processed.can_transition_to(TakenDown));
        assert!(TakenDown.can_transition_to(Processed));

        assert!(!Processed.can_transition_to(Processing));
        assert!(!Uploaded.can_transition_to(Processed));
        assert!(!Failed.can_transition_to(Processed));
    }

    #[test]
    fn terminal_states() {
        assert!(DocumentStatus::Processed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
        assert!(DocumentStatus::Quarantined.is_terminal());
        assert!(DocumentStatus::Rejected.is_terminal());
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(!DocumentStatus::Uploaded.is_terminal());
    }

    #[test]
    fn status_string_round_trip() {
        for s in [
            DocumentStatus::Uploaded,
            DocumentStatus::Processing,
            DocumentStatus::Processed,
            DocumentStatus::Failed,
            DocumentStatus::Quarantined,
            DocumentStatus::Rejected,
            DocumentStatus::TakenDown,
        ] {
            assert_eq!(s.as_str().parse::<DocumentStatus>().unwrap(), s);
        }
    }

    #[test]
    fn scan_record_constructors() {
        let clean = ScanRecord::clean("cloud-scan", "0 engines flagged");
        assert!(clean.clean);
        assert!(clean.threat.is_none());

        let unclean = ScanRecord::unclean("signature-validation", "pattern match", "Script tag");
        assert!(!unclean.clean);
        assert_eq!(unclean.threat.as_deref(), Some("Script tag"));
    }
}
