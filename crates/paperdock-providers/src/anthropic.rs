//! Anthropic messages-API metadata provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::prompt::{build_prompt, parse_draft};
use crate::provider::{DraftMetadata, MetadataProvider, ProviderError};

const PROVIDER_NAME: &str = "anthropic";
const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Serialize)]
struct MessageParam {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key,
            model: model.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl MetadataProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, text: &str, filename: &str) -> Result<DraftMetadata, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured)?;

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: build_prompt(text, filename),
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER_NAME,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Request {
                provider: PROVIDER_NAME,
                reason: format!("{status} - {error_text}"),
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| ProviderError::MalformedResponse {
                provider: PROVIDER_NAME,
                reason: e.to_string(),
            })?;

        let content = parsed
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text,
            })
            .next()
            .unwrap_or_default();

        parse_draft(&content).map_err(|reason| ProviderError::MalformedResponse {
            provider: PROVIDER_NAME,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdock_core::models::Category;
    use serde_json::json;

    #[tokio::test]
    async fn parses_a_text_block_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", API_VERSION)
            .with_body(
                json!({
                    "content": [{
                        "type": "text",
                        "text": "{\"title\": \"Syllabus\", \"description\": \"Course outline.\", \"tags\": [\"course\"], \"category\": \"education\"}"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = AnthropicProvider::new(
            Some("sk-ant-test".to_string()),
            "claude-3-5-haiku-20241022",
        )
        .with_base_url(server.url());

        let draft = provider.generate("syllabus text", "syllabus.docx").await.unwrap();
        assert_eq!(draft.title, "Syllabus");
        assert_eq!(draft.category, Category::Education);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unconfigured_without_api_key() {
        let provider = AnthropicProvider::new(None, "claude-3-5-haiku-20241022");
        assert!(!provider.is_configured());
        let err = provider.generate("t", "f.pdf").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }
}
