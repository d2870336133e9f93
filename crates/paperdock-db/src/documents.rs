//! Document repository: the pipeline's writes to the document store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use paperdock_core::models::{
    Category, Document, DocumentStatus, FileType, ProcessingResults, ScanRecord,
};

/// The document-store operations the pipeline needs.
///
/// Derived fields are written in one shot by [`apply_processing_results`] so
/// readers polling status never observe half-complete metadata. The one-shot
/// write and [`mark_processing`] are conditional on the current status
/// (optimistic update): a takedown landing mid-flight makes the write a no-op
/// rather than clobbering moderation state.
///
/// [`apply_processing_results`]: DocumentRepository::apply_processing_results
/// [`mark_processing`]: DocumentRepository::mark_processing
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>>;

    /// Insert a freshly uploaded document. Used by the upload collaborator
    /// and tests; the pipeline itself never inserts.
    async fn insert(&self, document: &Document) -> Result<()>;

    /// Move the document into `Processing`. Returns false if the current
    /// status does not allow it (already processed, or taken down).
    ///
    /// A document already in `Processing` is claimable: the queue only
    /// redelivers a job when the prior attempt was abandoned (worker crash,
    /// processing window elapsed), so a redelivery takes over the stale
    /// claim instead of leaving the document in `Processing` forever.
    async fn mark_processing(&self, id: Uuid) -> Result<bool>;

    /// Record the virus-scan verdict.
    async fn record_scan(&self, id: Uuid, record: &ScanRecord) -> Result<()>;

    /// Write all derived fields and set status `Processed`, conditional on
    /// the document still being in `Processing`. Returns false when the
    /// condition failed and nothing was written.
    async fn apply_processing_results(&self, id: Uuid, results: &ProcessingResults)
        -> Result<bool>;

    /// Set status `Failed` with the error message. Partial derived fields
    /// from earlier stages are retained for diagnostics.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()>;
}

/// Postgres-backed repository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_document(row: &PgRow) -> Result<Document> {
        let file_type: String = row.try_get("file_type")?;
        let status: String = row.try_get("status")?;
        let category: String = row.try_get("category")?;
        let tags: Vec<String> = row.try_get("tags")?;
        let scan_result: Option<serde_json::Value> = row.try_get("scan_result")?;

        Ok(Document {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            original_filename: row.try_get("original_filename")?,
            blob_key: row.try_get("blob_key")?,
            file_type: file_type
                .parse::<FileType>()
                .map_err(|e| anyhow::anyhow!(e))?,
            file_size: row.try_get("file_size")?,
            status: status
                .parse::<DocumentStatus>()
                .map_err(|e| anyhow::anyhow!(e))?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            tags,
            category: Category::parse_lenient(&category),
            page_count: row.try_get("page_count")?,
            thumbnail_key: row.try_get("thumbnail_key")?,
            fingerprint: row.try_get("fingerprint")?,
            metadata: row
                .try_get::<Option<serde_json::Value>, _>("metadata")?
                .unwrap_or(serde_json::Value::Null),
            scan_result: scan_result
                .map(serde_json::from_value)
                .transpose()
                .context("malformed scan_result column")?,
            processing_error: row.try_get("processing_error")?,
            uploaded_at: row.try_get("uploaded_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load document")?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn insert(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, owner_id, original_filename, blob_key, file_type, file_size,
                status, tags, category, metadata, uploaded_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(document.id)
        .bind(document.owner_id)
        .bind(&document.original_filename)
        .bind(&document.blob_key)
        .bind(document.file_type.to_string())
        .bind(document.file_size)
        .bind(document.status.as_str())
        .bind(&document.tags)
        .bind(document.category.as_str())
        .bind(&document.metadata)
        .bind(document.uploaded_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to insert document")?;
        Ok(())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'processing', updated_at = $2 \
             WHERE id = $1 AND status IN ('uploaded', 'failed', 'processing')",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to mark document processing")?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_scan(&self, id: Uuid, record: &ScanRecord) -> Result<()> {
        sqlx::query("UPDATE documents SET scan_result = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(serde_json::to_value(record)?)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to record scan result")?;
        Ok(())
    }

    async fn apply_processing_results(
        &self,
        id: Uuid,
        results: &ProcessingResults,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                status = 'processed',
                title = $2,
                description = $3,
                tags = $4,
                category = $5,
                page_count = $6,
                thumbnail_key = $7,
                fingerprint = $8,
                metadata = $9,
                processing_error = NULL,
                updated_at = $10
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(&results.title)
        .bind(&results.description)
        .bind(&results.tags)
        .bind(results.category.as_str())
        .bind(results.page_count)
        .bind(&results.thumbnail_key)
        .bind(&results.fingerprint)
        .bind(&results.metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to apply processing results")?;

        let applied = result.rows_affected() == 1;
        if !applied {
            tracing::warn!(
                document_id = %id,
                "processing results not applied, document left processing state concurrently"
            );
        }
        Ok(applied)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE documents SET status = 'failed', processing_error = $2, updated_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to mark document failed")?;
        Ok(())
    }
}
