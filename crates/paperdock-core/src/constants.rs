//! Shared constants for the ingestion pipeline.

/// Smallest accepted upload, in bytes.
pub const MIN_FILE_SIZE_BYTES: i64 = 1;

/// Largest accepted upload, in bytes (100 MB).
pub const MAX_FILE_SIZE_BYTES: i64 = 100 * 1024 * 1024;

/// Hard per-submission ceiling of the cloud scanning service (32 MB).
/// Files above this are scanned with the local signature tier instead.
pub const CLOUD_SCAN_MAX_BYTES: i64 = 32 * 1024 * 1024;

/// Maximum length of a generated title.
pub const MAX_TITLE_CHARS: usize = 255;

/// Maximum length of a generated description.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Words assumed per page when a format carries no structural page count.
pub const WORDS_PER_PAGE: usize = 500;

/// Characters assumed per page when a format carries no structural page count.
pub const CHARS_PER_PAGE: usize = 3000;
