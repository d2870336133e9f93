//! Document processing stages: extraction, page counting, security scanning,
//! thumbnail rendering, and content fingerprinting.
//!
//! Every capability dispatches on [`paperdock_core::models::FileType`] rather
//! than raw extension strings; adding a format means implementing one arm per
//! capability.

pub mod extract;
pub mod fingerprint;
pub mod ocr;
pub mod pages;
pub mod scan;
pub mod thumbnail;

pub use extract::{ContentExtractor, Extraction, ExtractionError, ExtractionMethod};
pub use fingerprint::fingerprint;
pub use ocr::{OcrEngine, TesseractOcr};
pub use pages::count_pages;
pub use scan::{CloudScanner, FallbackScanner, ScanError, Scanner, SignatureScanner};
pub use thumbnail::{ThumbnailEngine, ThumbnailRenderer};
