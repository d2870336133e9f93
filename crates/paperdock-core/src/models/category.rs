//! Closed category taxonomy for generated metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document category assigned by the metadata generator.
///
/// The set is closed: AI providers are prompted with this exact list and
/// anything outside it (or any parse failure) maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Business,
    Education,
    Legal,
    Finance,
    Technology,
    Science,
    Health,
    Marketing,
    Engineering,
    Government,
    Creative,
    Personal,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Business,
        Category::Education,
        Category::Legal,
        Category::Finance,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Marketing,
        Category::Engineering,
        Category::Government,
        Category::Creative,
        Category::Personal,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Education => "education",
            Category::Legal => "legal",
            Category::Finance => "finance",
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Health => "health",
            Category::Marketing => "marketing",
            Category::Engineering => "engineering",
            Category::Government => "government",
            Category::Creative => "creative",
            Category::Personal => "personal",
            Category::Other => "other",
        }
    }

    /// Lenient parse: unknown input becomes `Other` instead of an error, so a
    /// provider inventing a category never fails the chain.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s.trim()).unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Category::ALL
            .iter()
            .find(|c| c.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}
