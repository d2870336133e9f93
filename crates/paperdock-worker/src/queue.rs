//! Job queue and worker pool.
//!
//! The pool polls the queue at a fixed interval, bounds concurrency with a
//! semaphore, and enforces a per-job timeout. Failures branch on
//! [`IngestError::is_retryable`]: permanent failures are dropped immediately,
//! retryable ones go back on the queue with exponential backoff until the
//! retry budget runs out.
//!
//! The per-job timeout is the pool's visibility window: a job that exceeds
//! it is torn down, its document is marked failed with the timeout reason,
//! and the redelivered attempt re-claims the document from scratch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

use paperdock_core::config::WorkerConfig;
use paperdock_core::models::IngestJob;

use crate::pipeline::IngestPipeline;

/// Maximum delay in seconds before redelivering a failed job. Caps the
/// exponential backoff so high retry counts do not produce excessive delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    (2_u64.pow(retry_count.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

/// At-least-once delivery of ingestion jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, job: IngestJob) -> Result<()>;

    /// Take the next deliverable job, if any.
    async fn claim_next(&self) -> Result<Option<IngestJob>>;

    /// Acknowledge successful processing.
    async fn complete(&self, job: &IngestJob) -> Result<()>;

    /// Redeliver after backoff with an incremented retry count.
    async fn retry(&self, job: IngestJob) -> Result<()>;

    /// Drop the job permanently.
    async fn fail(&self, job: &IngestJob) -> Result<()>;
}

#[derive(Default)]
struct QueueState {
    pending: Vec<(IngestJob, DateTime<Utc>)>,
    completed: Vec<Uuid>,
    failed: Vec<Uuid>,
}

/// In-process queue for tests and single-node deployments.
#[derive(Clone, Default)]
pub struct MemoryJobQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document ids of completed jobs, in completion order.
    pub async fn completed(&self) -> Vec<Uuid> {
        self.state.lock().await.completed.clone()
    }

    /// Document ids of permanently failed jobs.
    pub async fn failed(&self) -> Vec<Uuid> {
        self.state.lock().await.failed.clone()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn submit(&self, job: IngestJob) -> Result<()> {
        self.state.lock().await.pending.push((job, Utc::now()));
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<IngestJob>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let position = state
            .pending
            .iter()
            .position(|(_, available_at)| *available_at <= now);
        Ok(position.map(|i| state.pending.remove(i).0))
    }

    async fn complete(&self, job: &IngestJob) -> Result<()> {
        self.state.lock().await.completed.push(job.document_id);
        Ok(())
    }

    async fn retry(&self, mut job: IngestJob) -> Result<()> {
        job.retry_count += 1;
        let backoff = compute_retry_backoff_seconds(job.retry_count);
        let available_at = Utc::now() + chrono::Duration::seconds(backoff as i64);
        self.state.lock().await.pending.push((job, available_at));
        Ok(())
    }

    async fn fail(&self, job: &IngestJob) -> Result<()> {
        self.state.lock().await.failed.push(job.document_id);
        Ok(())
    }
}

/// Postgres-backed queue over the `ingest_jobs` table. The upload
/// collaborator inserts a row per uploaded document; workers on any number
/// of nodes share the table, with `FOR UPDATE SKIP LOCKED` keeping
/// concurrent claims from colliding.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn submit(&self, job: IngestJob) -> Result<()> {
        sqlx::query(
            "INSERT INTO ingest_jobs (document_id, blob_key, retry_count, status, available_at) \
             VALUES ($1, $2, $3, 'pending', NOW())",
        )
        .bind(job.document_id)
        .bind(&job.blob_key)
        .bind(job.retry_count)
        .execute(&self.pool)
        .await
        .context("failed to submit ingest job")?;
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<IngestJob>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin claim transaction")?;

        let row = sqlx::query(
            "SELECT document_id, blob_key, retry_count FROM ingest_jobs \
             WHERE status = 'pending' AND available_at <= NOW() \
             ORDER BY available_at ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED",
        )
        .fetch_optional(&mut *tx)
        .await
        .context("failed to fetch next ingest job")?;

        let Some(row) = row else {
            tx.commit().await.context("failed to commit empty claim")?;
            return Ok(None);
        };

        let job = IngestJob {
            document_id: row.try_get("document_id")?,
            blob_key: row.try_get("blob_key")?,
            retry_count: row.try_get("retry_count")?,
        };

        sqlx::query(
            "UPDATE ingest_jobs SET status = 'running', updated_at = NOW() \
             WHERE document_id = $1",
        )
        .bind(job.document_id)
        .execute(&mut *tx)
        .await
        .context("failed to mark ingest job running")?;
        tx.commit().await.context("failed to commit claim")?;

        Ok(Some(job))
    }

    async fn complete(&self, job: &IngestJob) -> Result<()> {
        sqlx::query(
            "UPDATE ingest_jobs SET status = 'completed', updated_at = NOW() \
             WHERE document_id = $1 AND status = 'running'",
        )
        .bind(job.document_id)
        .execute(&self.pool)
        .await
        .context("failed to complete ingest job")?;
        Ok(())
    }

    async fn retry(&self, mut job: IngestJob) -> Result<()> {
        job.retry_count += 1;
        let backoff = compute_retry_backoff_seconds(job.retry_count);
        sqlx::query(
            "UPDATE ingest_jobs SET status = 'pending', retry_count = $2, \
             available_at = NOW() + make_interval(secs => $3), updated_at = NOW() \
             WHERE document_id = $1",
        )
        .bind(job.document_id)
        .bind(job.retry_count)
        .bind(backoff as f64)
        .execute(&self.pool)
        .await
        .context("failed to reschedule ingest job")?;
        Ok(())
    }

    async fn fail(&self, job: &IngestJob) -> Result<()> {
        sqlx::query(
            "UPDATE ingest_jobs SET status = 'failed', updated_at = NOW() \
             WHERE document_id = $1",
        )
        .bind(job.document_id)
        .execute(&self.pool)
        .await
        .context("failed to mark ingest job failed")?;
        Ok(())
    }
}

/// Polling worker pool over a [`JobQueue`].
pub struct WorkerPool {
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerPool {
    pub fn start(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(Self::worker_pool(queue, pipeline, config, shutdown_rx));
        Self { shutdown_tx }
    }

    /// Signals the pool to stop claiming jobs. Returns immediately; in-flight
    /// jobs keep running until they finish or time out.
    pub async fn shutdown(&self) {
        tracing::info!("initiating worker pool shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_pool(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: WorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "ingest worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("ingest worker pool shutting down");
                    break;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&queue, &pipeline, &semaphore, &config).await;
                }
            }
        }

        tracing::info!("ingest worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        queue: &Arc<dyn JobQueue>,
        pipeline: &Arc<IngestPipeline>,
        semaphore: &Arc<Semaphore>,
        config: &WorkerConfig,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("no workers available, skipping claim");
                return;
            }
        };

        match queue.claim_next().await {
            Ok(Some(job)) => {
                let queue = queue.clone();
                let pipeline = pipeline.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::process_job(job, queue, pipeline, config).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("no jobs available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "failed to claim job from queue");
            }
        }
    }

    async fn process_job(
        job: IngestJob,
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: WorkerConfig,
    ) {
        let timeout = Duration::from_secs(config.job_timeout_secs);
        let outcome = tokio::time::timeout(timeout, pipeline.process(&job)).await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(document_id = %job.document_id, "ingest job completed");
                if let Err(e) = queue.complete(&job).await {
                    tracing::error!(error = %e, "failed to acknowledge completed job");
                }
            }
            Ok(Err(e)) => {
                tracing::error!(
                    document_id = %job.document_id,
                    error = %e,
                    retry_count = job.retry_count,
                    retryable = e.is_retryable(),
                    "ingest job failed"
                );
                if !e.is_retryable() {
                    let _ = queue.fail(&job).await;
                } else if job.retry_count < config.max_retries {
                    let backoff_seconds = compute_retry_backoff_seconds(job.retry_count + 1);
                    tracing::info!(
                        document_id = %job.document_id,
                        retry_count = job.retry_count + 1,
                        backoff_seconds,
                        "scheduling job retry"
                    );
                    let _ = queue.retry(job).await;
                } else {
                    tracing::error!(document_id = %job.document_id, "ingest job failed after max retries");
                    let _ = queue.fail(&job).await;
                }
            }
            Err(_) => {
                tracing::error!(
                    document_id = %job.document_id,
                    timeout_secs = config.job_timeout_secs,
                    "ingest job timed out"
                );
                pipeline.record_timeout(&job, config.job_timeout_secs).await;
                if job.retry_count < config.max_retries {
                    let _ = queue.retry(job).await;
                } else {
                    let _ = queue.fail(&job).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(12), MAX_RETRY_BACKOFF_SECS);
    }

    fn job() -> IngestJob {
        IngestJob {
            document_id: Uuid::new_v4(),
            blob_key: "uploads/u/file.pdf".to_string(),
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn claim_is_fifo_for_available_jobs() {
        let queue = MemoryJobQueue::new();
        let first = job();
        let second = job();
        queue.submit(first.clone()).await.unwrap();
        queue.submit(second.clone()).await.unwrap();

        let claimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.document_id, first.document_id);
        let claimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.document_id, second.document_id);
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retried_job_is_deferred_by_backoff() {
        let queue = MemoryJobQueue::new();
        queue.retry(job()).await.unwrap();

        // Backoff puts the job in the future, so it is not claimable yet.
        assert!(queue.claim_next().await.unwrap().is_none());
        assert_eq!(queue.pending_len().await, 1);
    }

    #[tokio::test]
    async fn retry_increments_count() {
        let queue = MemoryJobQueue::new();
        let original = job();
        queue.retry(original.clone()).await.unwrap();

        let state = queue.state.lock().await;
        assert_eq!(state.pending[0].0.retry_count, original.retry_count + 1);
    }

    #[tokio::test]
    async fn complete_and_fail_are_recorded() {
        let queue = MemoryJobQueue::new();
        let a = job();
        let b = job();
        queue.complete(&a).await.unwrap();
        queue.fail(&b).await.unwrap();
        assert_eq!(queue.completed().await, vec![a.document_id]);
        assert_eq!(queue.failed().await, vec![b.document_id]);
    }
}
