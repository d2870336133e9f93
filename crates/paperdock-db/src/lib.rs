//! Document store access for the ingestion pipeline.
//!
//! The pipeline treats the document store as a collaborator with a narrow
//! surface: read by id, claim for processing, and a handful of one-shot
//! writes. [`documents::DocumentRepository`] is that surface;
//! [`documents::PgDocumentRepository`] backs it with Postgres and
//! [`memory::MemoryDocumentRepository`] backs it in-process for tests and
//! local runs.

pub mod documents;
pub mod memory;

pub use documents::{DocumentRepository, PgDocumentRepository};
pub use memory::MemoryDocumentRepository;
