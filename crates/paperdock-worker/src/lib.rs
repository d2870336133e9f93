//! Ingestion worker: job queue, worker pool, and the processing pipeline.

pub mod pipeline;
pub mod queue;
pub mod scratch;

pub use pipeline::IngestPipeline;
pub use queue::{JobQueue, MemoryJobQueue, PgJobQueue, WorkerPool};
pub use scratch::ScratchDir;
