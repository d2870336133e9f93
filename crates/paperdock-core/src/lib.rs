//! Paperdock Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! constants shared across all paperdock components.

pub mod config;
pub mod constants;
pub mod ingest_error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use ingest_error::{IngestError, IngestResultExt};
