//! Shared prompt construction and response parsing for the hosted providers.

use paperdock_core::constants::{MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};
use paperdock_core::models::Category;

use crate::provider::DraftMetadata;

/// Characters of extracted content included in the prompt.
const PROMPT_CONTENT_CHARS: usize = 6000;

const MAX_TAGS: usize = 10;

pub(crate) fn build_prompt(text: &str, filename: &str) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let excerpt: String = text.chars().take(PROMPT_CONTENT_CHARS).collect();

    format!(
        "Analyze the following document and respond with a single JSON object \
         containing exactly these fields:\n\
         - title: a concise document title (max {MAX_TITLE_CHARS} characters)\n\
         - description: a 1-3 sentence summary (max {MAX_DESCRIPTION_CHARS} characters)\n\
         - tags: an array of up to {MAX_TAGS} lowercase topic keywords\n\
         - category: exactly one of [{}]\n\n\
         Respond with valid JSON only, no prose before or after.\n\n\
         Filename: {filename}\n\n\
         Document content:\n{excerpt}",
        categories.join(", "),
    )
}

/// Parse a provider's text completion into a draft, tolerating markdown code
/// fences around the JSON. A missing or empty `title`/`description` is a
/// parse failure so the chain can move on to the next provider.
pub(crate) fn parse_draft(text: &str) -> Result<DraftMetadata, String> {
    #[derive(serde::Deserialize)]
    struct RawDraft {
        title: Option<String>,
        description: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        category: Option<String>,
    }

    let json_text = strip_code_fences(text);
    let raw: RawDraft =
        serde_json::from_str(json_text).map_err(|e| format!("invalid JSON: {e}"))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or("missing title")?;
    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or("missing description")?;

    Ok(DraftMetadata {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
        tags: raw
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect(),
        category: Category::parse_lenient(raw.category.as_deref().unwrap_or_default()),
    })
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn strip_code_fences(text: &str) -> &str {
    if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
            .trim()
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
            .trim()
    } else {
        text.trim()
    }
}
