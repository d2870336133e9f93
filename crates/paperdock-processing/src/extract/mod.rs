//! Text extraction per file format.

mod ooxml;
mod pdf;
mod sheet;

pub(crate) use ooxml::pptx_slide_count;
pub(crate) use pdf::embedded_page_images;
#[cfg(test)]
pub(crate) use sheet::workbook_bytes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task;

use paperdock_core::models::FileType;

use crate::ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {format} content: {reason}")]
    Parse { format: FileType, reason: String },

    #[error("document contains no extractable text")]
    NoText,
}

impl ExtractionError {
    pub(crate) fn parse(format: FileType, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            reason: err.to_string(),
        }
    }
}

/// How the text was obtained, recorded in the document metadata bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    PdfTextLayer,
    PdfOcr,
    DocxXml,
    PptxPlaceholder,
    XlsxSheets,
    CsvRaw,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::PdfTextLayer => "pdf-text-layer",
            ExtractionMethod::PdfOcr => "pdf-ocr",
            ExtractionMethod::DocxXml => "docx-xml",
            ExtractionMethod::PptxPlaceholder => "pptx-placeholder",
            ExtractionMethod::XlsxSheets => "xlsx-sheets",
            ExtractionMethod::CsvRaw => "csv-raw",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted text together with its provenance.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
}

/// Extracts plain text from a downloaded document.
///
/// PDFs with a sparse text layer (scans) fall back to OCR over the embedded
/// page images when an [`OcrEngine`] is configured. Whitespace-only output is
/// reported as [`ExtractionError::NoText`] rather than silently passed on.
pub struct ContentExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    ocr_max_pages: usize,
}

impl ContentExtractor {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, ocr_max_pages: usize) -> Self {
        Self { ocr, ocr_max_pages }
    }

    pub async fn extract(
        &self,
        path: &Path,
        file_type: FileType,
    ) -> Result<Extraction, ExtractionError> {
        let (text, method) = match file_type {
            FileType::Pdf => {
                pdf::extract_pdf(path, self.ocr.as_deref(), self.ocr_max_pages).await?
            }
            FileType::Docx => (
                run_blocking(path, ooxml::extract_docx).await?,
                ExtractionMethod::DocxXml,
            ),
            FileType::Pptx => (
                run_blocking(path, ooxml::extract_pptx).await?,
                ExtractionMethod::PptxPlaceholder,
            ),
            FileType::Xlsx => (
                run_blocking(path, sheet::extract_xlsx).await?,
                ExtractionMethod::XlsxSheets,
            ),
            FileType::Csv => (
                tokio::fs::read_to_string(path).await?,
                ExtractionMethod::CsvRaw,
            ),
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(Extraction { text, method })
    }
}

async fn run_blocking<F>(path: &Path, f: F) -> Result<String, ExtractionError>
where
    F: FnOnce(&Path) -> Result<String, ExtractionError> + Send + 'static,
{
    let path: PathBuf = path.to_owned();
    task::spawn_blocking(move || f(&path))
        .await
        .map_err(|e| ExtractionError::Io(std::io::Error::other(e)))?
}
