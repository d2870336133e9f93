//! Priority-ordered provider chain with uniform enrichment.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use paperdock_core::models::Category;

use crate::local::{detect_language, key_themes, readability_score, summarize, LocalAnalyzer};
use crate::provider::{DraftMetadata, MetadataProvider};

/// Final metadata for a document: the winning draft plus the derived fields
/// every document gets regardless of which provider produced the draft.
#[derive(Debug, Clone)]
pub struct GeneratedMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub generated_by: String,
    pub word_count: usize,
    pub readability: u8,
    pub metadata: serde_json::Value,
}

/// Tries each hosted provider in order and falls back to [`LocalAnalyzer`].
/// Provider failures are logged and absorbed; generation as a whole never
/// fails.
pub struct ProviderChain {
    providers: Vec<Arc<dyn MetadataProvider>>,
    local: LocalAnalyzer,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self {
            providers,
            local: LocalAnalyzer::new(),
        }
    }

    pub async fn generate(
        &self,
        text: &str,
        filename: &str,
        page_count: i32,
        extraction_method: &str,
    ) -> GeneratedMetadata {
        for provider in &self.providers {
            if !provider.is_configured() {
                debug!(provider = provider.name(), "skipping unconfigured metadata provider");
                continue;
            }
            match provider.generate(text, filename).await {
                Ok(draft) => {
                    info!(provider = provider.name(), "metadata draft generated");
                    return enrich(draft, provider.name(), text, page_count, extraction_method);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "metadata provider failed, trying next"
                    );
                }
            }
        }

        debug!("all hosted providers exhausted, using local analyzer");
        let draft = self.local.analyze(text, filename);
        enrich(draft, self.local.name(), text, page_count, extraction_method)
    }
}

fn enrich(
    draft: DraftMetadata,
    generated_by: &str,
    text: &str,
    page_count: i32,
    extraction_method: &str,
) -> GeneratedMetadata {
    let word_count = text.split_whitespace().count();
    let readability = readability_score(text);

    let metadata = json!({
        "wordCount": word_count,
        "charCount": text.chars().count(),
        "pageCount": page_count,
        "language": detect_language(text),
        "readabilityScore": readability,
        "keyThemes": key_themes(text),
        "summary": summarize(text),
        "extractionMethod": extraction_method,
        "generatedBy": generated_by,
        "processedAt": Utc::now().to_rfc3339(),
    });

    GeneratedMetadata {
        title: draft.title,
        description: draft.description,
        tags: draft.tags,
        category: draft.category,
        generated_by: generated_by.to_string(),
        word_count,
        readability,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;

    struct FakeProvider {
        name: &'static str,
        configured: bool,
        outcome: Result<DraftMetadata, &'static str>,
    }

    #[async_trait]
    impl MetadataProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(
            &self,
            _text: &str,
            _filename: &str,
        ) -> Result<DraftMetadata, ProviderError> {
            match &self.outcome {
                Ok(draft) => Ok(draft.clone()),
                Err(reason) => Err(ProviderError::Request {
                    provider: self.name,
                    reason: reason.to_string(),
                }),
            }
        }
    }

    fn draft(title: &str) -> DraftMetadata {
        DraftMetadata {
            title: title.to_string(),
            description: "A description.".to_string(),
            tags: vec!["tag".to_string()],
            category: Category::Business,
        }
    }

    #[tokio::test]
    async fn first_healthy_provider_wins() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider {
                name: "primary",
                configured: true,
                outcome: Ok(draft("From Primary")),
            }),
            Arc::new(FakeProvider {
                name: "secondary",
                configured: true,
                outcome: Ok(draft("From Secondary")),
            }),
        ]);

        let meta = chain
            .generate("some document text", "doc.pdf", 1, "pdf-text-layer")
            .await;
        assert_eq!(meta.title, "From Primary");
        assert_eq!(meta.generated_by, "primary");
    }

    #[tokio::test]
    async fn failures_and_unconfigured_fall_through() {
        let chain = ProviderChain::new(vec![
            Arc::new(FakeProvider {
                name: "unconfigured",
                configured: false,
                outcome: Ok(draft("nope")),
            }),
            Arc::new(FakeProvider {
                name: "broken",
                configured: true,
                outcome: Err("503 from upstream"),
            }),
            Arc::new(FakeProvider {
                name: "healthy",
                configured: true,
                outcome: Ok(draft("Finally")),
            }),
        ]);

        let meta = chain
            .generate("some document text", "doc.pdf", 1, "pdf-text-layer")
            .await;
        assert_eq!(meta.title, "Finally");
        assert_eq!(meta.generated_by, "healthy");
    }

    #[tokio::test]
    async fn exhausted_chain_uses_local_analyzer() {
        let chain = ProviderChain::new(vec![Arc::new(FakeProvider {
            name: "broken",
            configured: true,
            outcome: Err("timeout"),
        })]);

        let meta = chain
            .generate("Board Meeting Minutes\n\nThe meeting covered the company strategy and client proposals in detail.", "minutes.docx", 2, "docx-xml")
            .await;
        assert_eq!(meta.generated_by, "smart-local-processor");
        assert!(!meta.title.is_empty());
    }

    #[tokio::test]
    async fn enrichment_is_uniform() {
        let chain = ProviderChain::new(vec![]);
        let meta = chain
            .generate("One sentence of text here. Another sentence follows it.", "f.pdf", 3, "pdf-text-layer")
            .await;

        let bag = meta.metadata.as_object().unwrap();
        for key in [
            "wordCount",
            "charCount",
            "pageCount",
            "language",
            "readabilityScore",
            "keyThemes",
            "summary",
            "extractionMethod",
            "generatedBy",
            "processedAt",
        ] {
            assert!(bag.contains_key(key), "missing {key}");
        }
        assert_eq!(bag["pageCount"], 3);
        assert_eq!(bag["language"], "en");
        assert_eq!(bag["extractionMethod"], "pdf-text-layer");
        assert_eq!(meta.word_count, 9);
    }
}
