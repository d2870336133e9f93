//! Local signature and heuristic scanning (Tier 2).

use async_trait::async_trait;

use paperdock_core::constants::MAX_FILE_SIZE_BYTES;
use paperdock_core::models::{FileType, ScanRecord};

use super::{ScanError, Scanner};

const SCANNER_NAME: &str = "signature-validation";

/// Extensions that should never appear anywhere in an uploaded filename,
/// including as an inner segment of a double extension ("report.pdf.exe").
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "pif", "msi", "dll", "js", "vbs", "jar", "sh", "ps1",
];

/// Byte sequences that have no business in the supported document formats.
const SUSPICIOUS_PATTERNS: &[&[u8]] = &[b"<script", b"<?php", b"eval("];

#[derive(Default)]
pub struct SignatureScanner;

impl SignatureScanner {
    pub fn new() -> Self {
        Self
    }

    fn verdict(data: &[u8], filename: &str, file_type: FileType) -> ScanRecord {
        if data.is_empty() {
            return ScanRecord::unclean(SCANNER_NAME, "file is empty", "empty-file");
        }
        if data.len() as i64 > MAX_FILE_SIZE_BYTES {
            return ScanRecord::unclean(
                SCANNER_NAME,
                format!("file of {} bytes exceeds the upload limit", data.len()),
                "oversize-file",
            );
        }

        if let Some(ext) = dangerous_extension(filename) {
            return ScanRecord::unclean(
                SCANNER_NAME,
                format!("filename carries executable extension .{ext}"),
                format!("dangerous-extension:{ext}"),
            );
        }

        if let Some(magic) = file_type.magic_number() {
            if !data.starts_with(magic) {
                return ScanRecord::unclean(
                    SCANNER_NAME,
                    format!("file header does not match claimed {file_type} format"),
                    "magic-number-mismatch",
                );
            }
        }

        if data.starts_with(b"#!") {
            return ScanRecord::unclean(
                SCANNER_NAME,
                "file starts with a shebang line",
                "embedded-script",
            );
        }
        if let Some(pattern) = find_suspicious_pattern(data) {
            return ScanRecord::unclean(
                SCANNER_NAME,
                format!("suspicious byte pattern {pattern:?} found in content"),
                "embedded-script",
            );
        }

        ScanRecord::clean(SCANNER_NAME, "signature checks passed")
    }
}

#[async_trait]
impl Scanner for SignatureScanner {
    fn name(&self) -> &'static str {
        SCANNER_NAME
    }

    async fn scan(
        &self,
        data: &[u8],
        filename: &str,
        file_type: FileType,
    ) -> Result<ScanRecord, ScanError> {
        Ok(Self::verdict(data, filename, file_type))
    }
}

fn dangerous_extension(filename: &str) -> Option<&str> {
    let lower = filename.to_lowercase();
    // Skip the leading segment: "exe.pdf" is a filename, not an extension.
    for segment in lower.split('.').skip(1) {
        if let Some(ext) = DANGEROUS_EXTENSIONS.iter().find(|&&e| e == segment) {
            return Some(ext);
        }
    }
    None
}

fn find_suspicious_pattern(data: &[u8]) -> Option<&'static [u8]> {
    let lowered: Vec<u8> = data.iter().map(|b| b.to_ascii_lowercase()).collect();
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|pattern| {
            lowered
                .windows(pattern.len())
                .any(|window| window == **pattern)
        })
        .copied()
}
