//! The metadata provider contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use paperdock_core::models::Category;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("{provider} request failed: {reason}")]
    Request {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} returned a malformed response: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },
}

/// Metadata as proposed by a single provider, before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Category,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the provider has the credentials it needs. Unconfigured
    /// providers are skipped by the chain without counting as failures.
    fn is_configured(&self) -> bool;

    async fn generate(&self, text: &str, filename: &str) -> Result<DraftMetadata, ProviderError>;
}
