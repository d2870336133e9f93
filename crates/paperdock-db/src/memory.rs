//! In-memory document repository for tests and local development.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use paperdock_core::models::{Document, DocumentStatus, ProcessingResults, ScanRecord};

use crate::documents::DocumentRepository;

#[derive(Clone, Default)]
pub struct MemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn insert(&self, document: &Document) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(doc)
                if matches!(
                    doc.status,
                    DocumentStatus::Uploaded | DocumentStatus::Failed | DocumentStatus::Processing
                ) =>
            {
                doc.status = DocumentStatus::Processing;
                doc.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_scan(&self, id: Uuid, record: &ScanRecord) -> Result<()> {
        if let Some(doc) = self.documents.write().await.get_mut(&id) {
            doc.scan_result = Some(record.clone());
            doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn apply_processing_results(
        &self,
        id: Uuid,
        results: &ProcessingResults,
    ) -> Result<bool> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(doc) if doc.status == DocumentStatus::Processing => {
                doc.status = DocumentStatus::Processed;
                doc.title = Some(results.title.clone());
                doc.description = Some(results.description.clone());
                doc.tags = results.tags.clone();
                doc.category = results.category;
                doc.page_count = Some(results.page_count);
                doc.thumbnail_key = Some(results.thumbnail_key.clone());
                doc.fingerprint = Some(results.fingerprint.clone());
                doc.metadata = results.metadata.clone();
                doc.processing_error = None;
                doc.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        if let Some(doc) = self.documents.write().await.get_mut(&id) {
            doc.status = DocumentStatus::Failed;
            doc.processing_error = Some(error.to_string());
            doc.updated_at = Utc::now();
        }
        Ok(())
    }
}
