//! The ingestion pipeline: one document from uploaded blob to processed
//! record.
//!
//! Stage failures fall into two classes. Permanent failures (missing document
//! record, unclean scan verdict) mark the document `Failed` and tell the
//! queue not to redeliver. Everything else is retryable: the document is also
//! marked `Failed` (with the error preserved for diagnostics) but the queue
//! redelivers, and `mark_processing` re-claims it from `Failed` on the next
//! attempt. A redelivery after a crashed or timed-out attempt re-claims the
//! document from `Processing` the same way, so an abandoned claim never
//! strands it. Thumbnail problems are not failures at all; the renderer
//! degrades to a badge card internally, and even a failure to write or
//! upload the badge is absorbed here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};

use paperdock_core::models::{Document, IngestJob, ProcessingResults};
use paperdock_core::{IngestError, IngestResultExt};
use paperdock_db::DocumentRepository;
use paperdock_processing::{
    count_pages, fingerprint, ContentExtractor, Scanner, ThumbnailEngine,
};
use paperdock_providers::ProviderChain;
use paperdock_storage::keys::thumbnail_key;
use paperdock_storage::BlobStore;

use crate::scratch::ScratchDir;

pub struct IngestPipeline {
    repository: Arc<dyn DocumentRepository>,
    store: Arc<dyn BlobStore>,
    scanner: Arc<dyn Scanner>,
    extractor: ContentExtractor,
    providers: ProviderChain,
    thumbnails: Arc<dyn ThumbnailEngine>,
    scratch_root: PathBuf,
}

impl IngestPipeline {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        store: Arc<dyn BlobStore>,
        scanner: Arc<dyn Scanner>,
        extractor: ContentExtractor,
        providers: ProviderChain,
        thumbnails: Arc<dyn ThumbnailEngine>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            repository,
            store,
            scanner,
            extractor,
            providers,
            thumbnails,
            scratch_root,
        }
    }

    #[tracing::instrument(skip(self, job), fields(document_id = %job.document_id))]
    pub async fn process(&self, job: &IngestJob) -> Result<(), IngestError> {
        let document = self
            .repository
            .find_by_id(job.document_id)
            .await
            .context("failed to load document")?
            .ok_or_else(|| {
                IngestError::permanent(anyhow!("document {} does not exist", job.document_id))
            })?;

        if !self
            .repository
            .mark_processing(document.id)
            .await
            .context("failed to claim document")?
        {
            info!(status = %document.status, "document not claimable, dropping job");
            return Ok(());
        }

        match self.run_stages(&document).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(db_err) = self
                    .repository
                    .mark_failed(document.id, &format!("{:#}", e.inner()))
                    .await
                {
                    error!(error = %db_err, "failed to persist processing failure");
                }
                Err(e)
            }
        }
    }

    /// Record a job whose processing window elapsed. The attempt itself was
    /// already torn down by the pool; this leaves the document in `Failed`
    /// (with the reason visible to the uploader) so the next delivery can
    /// re-claim it.
    pub async fn record_timeout(&self, job: &IngestJob, timeout_secs: u64) {
        let reason = format!("processing timed out after {timeout_secs}s");
        if let Err(e) = self.repository.mark_failed(job.document_id, &reason).await {
            error!(
                document_id = %job.document_id,
                error = %e,
                "failed to record processing timeout"
            );
        }
    }

    async fn run_stages(&self, document: &Document) -> Result<(), IngestError> {
        let scratch = ScratchDir::create(&self.scratch_root, document.id)
            .context("failed to create scratch directory")?;
        let source = scratch.file(&safe_filename(document));

        self.store
            .download_to(&document.blob_key, &source)
            .await
            .with_context(|| format!("failed to download blob {}", document.blob_key))?;
        let data = tokio::fs::read(&source)
            .await
            .context("failed to read downloaded blob")?;

        let record = self
            .scanner
            .scan(&data, &document.original_filename, document.file_type)
            .await
            .map_err(|e| anyhow!(e).context("virus scan failed"))?;
        self.repository
            .record_scan(document.id, &record)
            .await
            .context("failed to record scan verdict")?;
        if !record.clean {
            let threat = record.threat.as_deref().unwrap_or("unspecified threat");
            warn!(scanner = %record.scanner, threat, "scan flagged document");
            return Err(anyhow!("security scan flagged document: {threat} ({})", record.details))
                .permanent();
        }
        drop(data);

        let extraction = self
            .extractor
            .extract(&source, document.file_type)
            .await
            .context("content extraction failed")?;
        let text = extraction.text;

        let page_count = count_pages(&source, document.file_type, &text);

        let generated = self
            .providers
            .generate(
                &text,
                &document.original_filename,
                page_count,
                extraction.method.as_str(),
            )
            .await;

        // Cosmetic stage: the key is recorded either way, and any render or
        // upload problem is absorbed rather than failing the job.
        let thumb_key = thumbnail_key(&document.blob_key);
        if let Err(e) = self
            .upload_thumbnail(&scratch, &source, document, &text, page_count, &thumb_key)
            .await
        {
            warn!(error = %format!("{e:#}"), key = %thumb_key, "thumbnail stage failed");
        }

        let fingerprint = fingerprint(
            &text,
            &generated.tags,
            generated.category,
            generated.word_count,
            generated.readability,
        );

        let results = ProcessingResults {
            title: generated.title,
            description: generated.description,
            tags: generated.tags,
            category: generated.category,
            page_count,
            thumbnail_key: thumb_key,
            fingerprint,
            metadata: generated.metadata,
        };
        let applied = self
            .repository
            .apply_processing_results(document.id, &results)
            .await
            .context("failed to write processing results")?;
        if !applied {
            // The document left Processing while we worked (e.g. a takedown).
            // The write was a no-op; nothing to roll back.
            info!("processing results not applied, document status changed concurrently");
            return Ok(());
        }

        info!(
            generated_by = %generated.generated_by,
            page_count,
            "document processed"
        );
        Ok(())
    }

    async fn upload_thumbnail(
        &self,
        scratch: &ScratchDir,
        source: &Path,
        document: &Document,
        text: &str,
        page_count: i32,
        thumb_key: &str,
    ) -> anyhow::Result<()> {
        let thumb_path = scratch.file("thumbnail.jpg");
        self.thumbnails
            .render(
                source,
                &thumb_path,
                document.file_type,
                text,
                page_count,
                document.file_size,
            )
            .await
            .context("failed to render thumbnail")?;
        let thumb_bytes = tokio::fs::read(&thumb_path)
            .await
            .context("failed to read rendered thumbnail")?;
        self.store
            .upload(thumb_key, thumb_bytes, "image/jpeg")
            .await
            .with_context(|| format!("failed to upload thumbnail {thumb_key}"))?;
        Ok(())
    }
}

/// The scratch file keeps the original filename (extension intact, path
/// separators stripped) so format-specific stages see a realistic name.
fn safe_filename(document: &Document) -> String {
    Path::new(&document.original_filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("document.{}", document.file_type.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdock_core::models::FileType;
    use uuid::Uuid;

    fn doc(filename: &str) -> Document {
        Document::new_uploaded(
            Uuid::new_v4(),
            filename,
            "uploads/u/key.pdf",
            FileType::Pdf,
            100,
        )
    }

    #[test]
    fn safe_filename_strips_path_components() {
        assert_eq!(safe_filename(&doc("report.pdf")), "report.pdf");
        assert_eq!(safe_filename(&doc("../../etc/passwd.pdf")), "passwd.pdf");
    }

    #[test]
    fn safe_filename_falls_back_to_extension() {
        assert_eq!(safe_filename(&doc("..")), "document.pdf");
    }
}
