//! Ingestion worker binary: wires configuration into the pipeline and runs
//! the worker pool until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use paperdock_core::Config;
use paperdock_db::{DocumentRepository, PgDocumentRepository};
use paperdock_processing::{
    CloudScanner, ContentExtractor, FallbackScanner, Scanner, SignatureScanner, TesseractOcr,
    ThumbnailRenderer,
};
use paperdock_providers::{
    AnthropicProvider, MetadataProvider, OpenAiProvider, ProviderChain,
};
use paperdock_storage::{BlobStore, LocalBlobStore, S3BlobStore};
use paperdock_worker::{IngestPipeline, JobQueue, PgJobQueue, WorkerPool};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "starting ingestion worker");

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.worker.max_workers as u32 + 2)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;
    let repository: Arc<dyn DocumentRepository> = Arc::new(PgDocumentRepository::new(pool.clone()));

    let store: Arc<dyn BlobStore> = match config.storage_backend.as_str() {
        "s3" => Arc::new(S3BlobStore::new(
            config.s3_bucket.clone().unwrap_or_default(),
            config.s3_region.clone().unwrap_or_else(|| "us-east-1".to_string()),
            config.s3_endpoint.clone(),
        )?),
        _ => Arc::new(LocalBlobStore::new(
            config.local_storage_path.clone().unwrap_or_default(),
            None,
        )),
    };

    let scanner: Arc<dyn Scanner> = {
        let cloud = match (&config.cloud_scan_url, &config.cloud_scan_api_key) {
            (Some(url), Some(key)) => {
                tracing::info!("cloud scanning tier enabled");
                Some(Arc::new(CloudScanner::new(url.clone(), key.clone())) as Arc<dyn Scanner>)
            }
            _ => {
                tracing::info!("cloud scanning not configured, signature tier only");
                None
            }
        };
        Arc::new(FallbackScanner::new(cloud, Arc::new(SignatureScanner::new())))
    };

    let ocr = TesseractOcr::new(&config.tesseract_path, &config.ocr_language);
    let extractor = if ocr.is_available().await {
        ContentExtractor::new(Some(Arc::new(ocr)), config.ocr_max_pages)
    } else {
        tracing::warn!(
            binary = %config.tesseract_path,
            "tesseract unavailable, scanned PDFs will not be OCRed"
        );
        ContentExtractor::new(None, config.ocr_max_pages)
    };

    let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();
    providers.push(Arc::new(OpenAiProvider::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    )));
    providers.push(Arc::new(AnthropicProvider::new(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    )));
    let chain = ProviderChain::new(providers);

    let scratch_root = config
        .scratch_dir
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);

    let pipeline = Arc::new(IngestPipeline::new(
        repository,
        store,
        scanner,
        extractor,
        chain,
        Arc::new(ThumbnailRenderer::new()),
        scratch_root,
    ));

    // Jobs arrive as `ingest_jobs` rows written by the upload service.
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool));
    let workers = WorkerPool::start(queue, pipeline, config.worker.clone());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    workers.shutdown().await;

    Ok(())
}
