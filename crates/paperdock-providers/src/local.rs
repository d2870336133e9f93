//! Heuristic metadata analyzer, the chain's infallible last resort.
//!
//! No model calls: titles come from document structure, descriptions from
//! paragraph scoring, tags from word and phrase frequency, categories from
//! weighted keyword buckets. Quality is below the hosted providers but the
//! analyzer always produces something usable.

use std::collections::HashMap;

use async_trait::async_trait;

use paperdock_core::constants::{MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};
use paperdock_core::models::{Category, FileType};

use crate::prompt::truncate_chars;
use crate::provider::{DraftMetadata, MetadataProvider, ProviderError};

const PROVIDER_NAME: &str = "smart-local-processor";

const MAX_TAGS: usize = 6;

/// Tokens that never become tags or influence scoring.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old",
    "see", "two", "way", "who", "its", "did", "yes", "with", "from", "this", "that", "have",
    "will", "your", "they", "been", "were", "said", "each", "which", "their", "would", "there",
    "about", "other", "these", "than", "then", "them", "some", "into", "more", "also", "when",
    "what", "where", "while", "shall", "such", "upon", "only", "very", "over", "under", "between",
    "through", "during", "before", "after", "above", "below", "being", "because", "should",
    "could", "here", "just", "like", "make", "made", "many", "most", "must", "both", "does",
];

#[derive(Default)]
pub struct LocalAnalyzer;

impl LocalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str, filename: &str) -> DraftMetadata {
        let title = derive_title(text, filename);
        let tags = derive_tags(text, &title);
        DraftMetadata {
            description: derive_description(text),
            category: derive_category(text),
            title: truncate_chars(&title, MAX_TITLE_CHARS),
            tags,
        }
    }
}

#[async_trait]
impl MetadataProvider for LocalAnalyzer {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, text: &str, filename: &str) -> Result<DraftMetadata, ProviderError> {
        Ok(self.analyze(text, filename))
    }
}

/// Title candidates depend on the format: page-structured documents
/// (pdf/docx) often open with a real heading line, so that is tried first;
/// everything else goes straight to line scoring, which favors lines with a
/// high share of capitalized words and a plausible word count.
fn derive_title(text: &str, filename: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(15)
        .collect();

    // A short capitalized line near the top reads like a heading.
    let page_structured = matches!(
        FileType::from_filename(filename),
        Some(FileType::Pdf | FileType::Docx)
    );
    if page_structured {
        if let Some(line) = lines.iter().find(|l| {
            let chars = l.chars().count();
            l.chars().next().is_some_and(char::is_uppercase)
                && (3..=80).contains(&chars)
                && l.split_whitespace().count() <= 12
                && !l.ends_with('.')
        }) {
            return (*line).to_string();
        }
    }

    // Otherwise the best line, weighted toward the top of the document and
    // toward title-cased wording.
    let best = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| (3..=14).contains(&l.split_whitespace().count()))
        .map(|(i, l)| {
            let score = (0.4 + capitalization_ratio(l))
                * (l.chars().count().min(60) as f64)
                * (1.0 - i as f64 * 0.05);
            (score, *l)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, l)| l);
    if let Some(line) = best {
        return truncate_chars(line, 80);
    }

    if let Some(sentence) = text.split(['.', '!', '?']).map(str::trim).find(|s| !s.is_empty())
    {
        return truncate_chars(sentence, 80);
    }

    cleaned_filename(filename)
}

/// Share of words that start with an uppercase letter.
fn capitalization_ratio(line: &str) -> f64 {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    capitalized as f64 / words.len() as f64
}

fn cleaned_filename(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(s, _)| s);
    let spaced: String = stem
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();
    let words: Vec<String> = spaced
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Untitled Document".to_string()
    } else {
        words.join(" ")
    }
}

/// Pick the paragraph with the best diversity-times-length score.
fn derive_description(text: &str) -> String {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| p.split_whitespace().count() >= 5)
        .take(30)
        .collect();

    let best = paragraphs
        .iter()
        .map(|p| {
            let words: Vec<String> = p
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect();
            let unique: std::collections::HashSet<&String> = words.iter().collect();
            let diversity = unique.len() as f64 / words.len().max(1) as f64;
            let score = diversity * (p.chars().count().min(400) as f64);
            (score, *p)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| p);

    let chosen = best.unwrap_or_else(|| text.trim());
    let flattened = chosen.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&flattened, MAX_DESCRIPTION_CHARS)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4 && w.chars().all(char::is_alphabetic))
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .take(3000)
        .collect()
}

fn derive_tags(text: &str, title: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let title_terms: Vec<String> = tokenize(title);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in &tokens {
        *counts.entry(token.clone()).or_default() += 1;
    }
    // 2-3 word phrases of consecutive kept tokens, counted when repeated.
    for window in [2usize, 3] {
        let mut phrase_counts: HashMap<String, usize> = HashMap::new();
        for chunk in tokens.windows(window) {
            *phrase_counts.entry(chunk.join(" ")).or_default() += 1;
        }
        for (phrase, count) in phrase_counts {
            if count >= 2 {
                counts.insert(phrase, count);
            }
        }
    }

    for term in &title_terms {
        if let Some(count) = counts.get_mut(term) {
            *count *= 3;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_TAGS)
        .map(|(tag, _)| tag)
        .collect()
}

fn category_buckets() -> Vec<(Category, Vec<(&'static str, usize)>)> {
    vec![
        (
            Category::Business,
            vec![
                ("business", 2), ("meeting", 1), ("strategy", 2), ("client", 1),
                ("company", 2), ("management", 1), ("proposal", 2),
            ],
        ),
        (
            Category::Education,
            vec![
                ("course", 2), ("student", 2), ("learning", 2), ("curriculum", 3),
                ("lesson", 2), ("university", 2), ("syllabus", 3),
            ],
        ),
        (
            Category::Legal,
            vec![
                ("agreement", 2), ("contract", 3), ("hereby", 3), ("liability", 2),
                ("clause", 2), ("pursuant", 3), ("plaintiff", 3), ("jurisdiction", 2),
            ],
        ),
        (
            Category::Finance,
            vec![
                ("invoice", 3), ("payment", 2), ("budget", 2), ("revenue", 2),
                ("expense", 2), ("financial", 2), ("fiscal", 2), ("audit", 2),
            ],
        ),
        (
            Category::Technology,
            vec![
                ("software", 2), ("server", 1), ("database", 2), ("code", 1),
                ("algorithm", 2), ("deployment", 2), ("network", 1), ("cloud", 1),
            ],
        ),
        (
            Category::Science,
            vec![
                ("research", 2), ("experiment", 2), ("hypothesis", 3), ("laboratory", 2),
                ("analysis", 1), ("study", 1), ("methodology", 2),
            ],
        ),
        (
            Category::Health,
            vec![
                ("patient", 3), ("medical", 3), ("treatment", 2), ("diagnosis", 3),
                ("clinical", 2), ("health", 2), ("medication", 2),
            ],
        ),
        (
            Category::Marketing,
            vec![
                ("campaign", 2), ("brand", 2), ("audience", 2), ("marketing", 3),
                ("advertising", 2), ("engagement", 1), ("conversion", 2),
            ],
        ),
        (
            Category::Engineering,
            vec![
                ("engineering", 3), ("specification", 2), ("tolerance", 2),
                ("mechanical", 2), ("voltage", 2), ("structural", 2), ("blueprint", 3),
            ],
        ),
        (
            Category::Government,
            vec![
                ("regulation", 2), ("policy", 2), ("federal", 2), ("municipal", 2),
                ("government", 3), ("agency", 1), ("statute", 3),
            ],
        ),
        (
            Category::Creative,
            vec![
                ("story", 1), ("photography", 2), ("music", 2), ("creative", 2),
                ("film", 2), ("novel", 2), ("artwork", 2),
            ],
        ),
        (
            Category::Personal,
            vec![
                ("diary", 3), ("family", 1), ("travel", 1), ("recipe", 2),
                ("personal", 2), ("journal", 2), ("wedding", 2),
            ],
        ),
    ]
}

fn derive_category(text: &str) -> Category {
    let tokens = tokenize(text);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_default() += 1;
    }

    let mut best = (Category::Other, 0usize);
    for (category, keywords) in category_buckets() {
        let score: usize = keywords
            .iter()
            .map(|(kw, weight)| counts.get(kw).copied().unwrap_or(0) * weight)
            .sum();
        if score > best.1 {
            best = (category, score);
        }
    }
    best.0
}

/// Function-word frequency over a handful of languages; defaults to English.
pub fn detect_language(text: &str) -> &'static str {
    const MARKERS: &[(&str, &[&str])] = &[
        ("en", &["the", "and", "of", "to", "is", "that", "for", "with", "was"]),
        ("es", &["el", "la", "los", "las", "que", "una", "es", "por", "como"]),
        ("fr", &["le", "les", "des", "une", "est", "dans", "pour", "avec", "sur"]),
        ("de", &["der", "die", "das", "und", "ist", "nicht", "eine", "mit", "für"]),
        ("it", &["il", "di", "che", "una", "per", "non", "sono", "della", "con"]),
        ("pt", &["os", "de", "que", "uma", "para", "com", "não", "mais", "como"]),
    ];

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in text.split_whitespace().take(2000) {
        let lower = word.to_lowercase();
        for (lang, markers) in MARKERS {
            if markers.contains(&lower.as_str()) {
                *counts.entry(lang).or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count >= 3)
        .map(|(lang, _)| lang)
        .unwrap_or("en")
}

/// Linear readability estimate from average sentence and word length,
/// clamped to 0..=100 (higher is easier).
pub fn readability_score(text: &str) -> u8 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0;
    }
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let avg_sentence_len = words.len() as f64 / sentences as f64;
    let avg_word_len =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64;

    let score = 110.0 - 1.2 * avg_sentence_len - 6.5 * avg_word_len;
    score.clamp(0.0, 100.0).round() as u8
}

/// First couple of sentences, flattened.
pub fn summarize(text: &str) -> String {
    let mut summary = String::new();
    for sentence in text.split_inclusive(['.', '!', '?']) {
        let trimmed = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
        if trimmed.is_empty() {
            continue;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(&trimmed);
        if summary.split(['.', '!', '?']).filter(|s| !s.trim().is_empty()).count() >= 2
            || summary.chars().count() > 240
        {
            break;
        }
    }
    truncate_chars(summary.trim(), 300)
}

/// The document's dominant topics: the top frequency-ranked terms without
/// any title boost.
pub fn key_themes(text: &str) -> Vec<String> {
    derive_tags(text, "").into_iter().take(3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "Service Agreement\n\n\
        This contract is made between the parties hereby named. The contract \
        covers liability, payment terms, and the governing jurisdiction. \
        Each clause of this agreement is binding pursuant to applicable law.\n\n\
        The parties agree to the terms described in this agreement.";

    #[test]
    fn title_prefers_a_heading_line() {
        assert_eq!(derive_title(CONTRACT, "scan001.pdf"), "Service Agreement");
    }

    #[test]
    fn title_candidates_depend_on_format() {
        let text = "Summary\nthe quick brown fox jumps over the lazy dog today";
        // A pdf opens with real headings, so the short capitalized line wins.
        assert_eq!(derive_title(text, "notes.pdf"), "Summary");
        // A csv has no heading structure; the one-word line is skipped and
        // line scoring picks the fuller line instead.
        assert_eq!(
            derive_title(text, "notes.csv"),
            "the quick brown fox jumps over the lazy dog today"
        );
    }

    #[test]
    fn title_scoring_favors_title_cased_lines() {
        let text = "the following table lists every transaction recorded this quarter\n\
                    Quarterly Sales Report Northern Region";
        assert_eq!(
            derive_title(text, "ledger.csv"),
            "Quarterly Sales Report Northern Region"
        );
    }

    #[test]
    fn title_falls_back_to_cleaned_filename() {
        assert_eq!(
            derive_title("", "q3_financial-report.pdf"),
            "Q3 Financial Report"
        );
        assert_eq!(derive_title("", "...."), "Untitled Document");
    }

    #[test]
    fn category_scores_legal_for_contract_text() {
        assert_eq!(derive_category(CONTRACT), Category::Legal);
    }

    #[test]
    fn category_defaults_to_other() {
        assert_eq!(derive_category("zebra giraffe pelican"), Category::Other);
    }

    #[test]
    fn tags_exclude_stopwords_and_boost_title_terms() {
        let tags = derive_tags(CONTRACT, "Service Agreement");
        assert!(tags.contains(&"agreement".to_string()));
        assert!(!tags.iter().any(|t| t == "this" || t == "the"));
        assert!(tags.len() <= MAX_TAGS);
    }

    #[test]
    fn language_detection_spots_spanish() {
        let es = "El informe describe los resultados que una empresa obtuvo, \
                  así como los planes que la dirección tiene para el futuro. \
                  La empresa considera que los objetivos son alcanzables.";
        assert_eq!(detect_language(es), "es");
        assert_eq!(detect_language("short"), "en");
    }

    #[test]
    fn readability_is_clamped() {
        assert_eq!(readability_score(""), 0);
        let simple = "The cat sat. The dog ran. A bird flew by.";
        let dense = "Notwithstanding aforementioned considerations, interdisciplinary \
                     collaborations necessitate comprehensive institutional frameworks \
                     facilitating multidimensional stakeholder engagement strategies.";
        assert!(readability_score(simple) > readability_score(dense));
        assert!(readability_score(simple) <= 100);
    }

    #[test]
    fn summary_takes_leading_sentences() {
        let summary = summarize(CONTRACT);
        assert!(summary.starts_with("Service Agreement"));
        assert!(summary.chars().count() <= 300);
    }

    #[tokio::test]
    async fn analyzer_never_produces_empty_fields() {
        let draft = LocalAnalyzer::new()
            .generate("x y z", "odd_file.csv")
            .await
            .unwrap();
        assert!(!draft.title.is_empty());
        assert!(!draft.description.is_empty());
    }
}
