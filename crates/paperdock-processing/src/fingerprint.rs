//! Lightweight content fingerprint for near-duplicate detection.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use paperdock_core::models::Category;

/// Characters of content that participate in the digest. Enough to tell
/// revisions apart without hashing multi-megabyte extractions.
const CONTENT_PREFIX_CHARS: usize = 2000;

/// Digest characters kept after encoding.
const FINGERPRINT_CHARS: usize = 24;

/// Derive a stable fingerprint from the extracted content and the finalized
/// metadata. The `local-` prefix marks fingerprints produced in-process, as
/// opposed to a future embedding-service scheme.
pub fn fingerprint(
    content: &str,
    tags: &[String],
    category: Category,
    word_count: usize,
    readability: u8,
) -> String {
    let prefix: String = content.chars().take(CONTENT_PREFIX_CHARS).collect();

    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(tags.join(",").as_bytes());
    hasher.update(b"\x1f");
    hasher.update(category.as_str().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(word_count.to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update([readability]);

    let encoded = STANDARD_NO_PAD.encode(hasher.finalize());
    format!("local-{}", &encoded[..FINGERPRINT_CHARS])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_prefixed() {
        let tags = vec!["alpha".to_string(), "beta".to_string()];
        let a = fingerprint("some content", &tags, Category::Technology, 2, 70);
        let b = fingerprint("some content", &tags, Category::Technology, 2, 70);
        assert_eq!(a, b);
        assert!(a.starts_with("local-"));
        assert_eq!(a.len(), "local-".len() + FINGERPRINT_CHARS);
    }

    #[test]
    fn different_inputs_diverge() {
        let tags = vec!["alpha".to_string()];
        let base = fingerprint("some content", &tags, Category::Technology, 2, 70);
        assert_ne!(
            base,
            fingerprint("other content", &tags, Category::Technology, 2, 70)
        );
        assert_ne!(base, fingerprint("some content", &[], Category::Technology, 2, 70));
        assert_ne!(
            base,
            fingerprint("some content", &tags, Category::Legal, 2, 70)
        );
        assert_ne!(
            base,
            fingerprint("some content", &tags, Category::Technology, 3, 70)
        );
        assert_ne!(
            base,
            fingerprint("some content", &tags, Category::Technology, 2, 71)
        );
    }

    #[test]
    fn only_the_content_prefix_matters() {
        let tags: Vec<String> = vec![];
        let long_a = format!("{}{}", "x".repeat(CONTENT_PREFIX_CHARS), " tail one");
        let long_b = format!("{}{}", "x".repeat(CONTENT_PREFIX_CHARS), " tail two");
        assert_eq!(
            fingerprint(&long_a, &tags, Category::Other, 3, 50),
            fingerprint(&long_b, &tags, Category::Other, 3, 50)
        );
    }
}
