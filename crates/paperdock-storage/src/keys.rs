//! Deterministic key derivation for generated artifacts.

/// Derive the thumbnail key for a source blob key.
///
/// Replaces the leading `uploads/` segment with `thumbnails/` and swaps the
/// extension for `.jpg`, so a source at `uploads/{owner}/{file}.pdf` maps to
/// `thumbnails/{owner}/{file}.jpg`. Keys outside `uploads/` keep their path
/// and only gain the prefix substitution on the first matching segment.
pub fn thumbnail_key(source_key: &str) -> String {
    let rekeyed = if let Some(rest) = source_key.strip_prefix("uploads/") {
        format!("thumbnails/{}", rest)
    } else {
        source_key.to_string()
    };

    match rekeyed.rfind('.') {
        // Only treat a dot in the final segment as an extension.
        Some(idx) if !rekeyed[idx..].contains('/') => format!("{}.jpg", &rekeyed[..idx]),
        _ => format!("{}.jpg", rekeyed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_prefix_is_substituted() {
        assert_eq!(
            thumbnail_key("uploads/user1/report.pdf"),
            "thumbnails/user1/report.jpg"
        );
    }

    #[test]
    fn extension_is_replaced_not_appended() {
        assert_eq!(
            thumbnail_key("uploads/a/deck.pptx"),
            "thumbnails/a/deck.jpg"
        );
        assert_eq!(
            thumbnail_key("uploads/a/archive.v2.xlsx"),
            "thumbnails/a/archive.v2.jpg"
        );
    }

    #[test]
    fn key_without_extension_gains_jpg() {
        assert_eq!(thumbnail_key("uploads/a/raw"), "thumbnails/a/raw.jpg");
    }

    #[test]
    fn dot_in_directory_is_not_an_extension() {
        assert_eq!(
            thumbnail_key("uploads/v1.2/data"),
            "thumbnails/v1.2/data.jpg"
        );
    }

    #[test]
    fn non_uploads_key_keeps_path() {
        assert_eq!(thumbnail_key("imports/x.csv"), "imports/x.jpg");
    }
}
