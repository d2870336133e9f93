//! Page counting per file format.
//!
//! Structural counts (PDF page tree, PPTX slide parts, XLSX sheets) are
//! preferred; when the container cannot be read the word/character heuristic
//! over the extracted text stands in so a count is always produced.

use std::path::Path;

use tracing::warn;

use paperdock_core::constants::{CHARS_PER_PAGE, WORDS_PER_PAGE};
use paperdock_core::models::FileType;

use crate::extract::pptx_slide_count;

pub fn count_pages(path: &Path, file_type: FileType, text: &str) -> i32 {
    let structural = match file_type {
        FileType::Pdf => pdf_page_count(path),
        FileType::Docx => return estimate_from_text(text),
        FileType::Pptx => pptx_slide_count(path).ok().filter(|&n| n > 0),
        FileType::Xlsx => xlsx_sheet_count(path),
        FileType::Csv => return 1,
    };

    match structural {
        Some(count) => count as i32,
        None => {
            warn!(file_type = %file_type, "structural page count unavailable, estimating from text");
            estimate_from_text(text)
        }
    }
}

/// Average of the words-per-page and characters-per-page estimates, rounded,
/// floored at one page.
fn estimate_from_text(text: &str) -> i32 {
    let words = text.split_whitespace().count() as f64;
    let chars = text.chars().count() as f64;
    let estimate = (words / WORDS_PER_PAGE as f64 + chars / CHARS_PER_PAGE as f64) / 2.0;
    (estimate.round() as i32).max(1)
}

fn pdf_page_count(path: &Path) -> Option<usize> {
    let doc = lopdf::Document::load(path).ok()?;
    let pages = doc.get_pages().len();
    (pages > 0).then_some(pages)
}

fn xlsx_sheet_count(path: &Path) -> Option<usize> {
    use calamine::{open_workbook, Reader, Xlsx};
    let workbook: Xlsx<_> = open_workbook(path).ok()?;
    let sheets = workbook.sheet_names().len();
    (sheets > 0).then_some(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_is_always_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert_eq!(count_pages(&path, FileType::Csv, "a,b\n1,2\n"), 1);
    }

    #[test]
    fn short_text_floors_at_one_page() {
        assert_eq!(estimate_from_text("just a few words"), 1);
        assert_eq!(estimate_from_text(""), 1);
    }

    #[test]
    fn thousand_words_is_about_two_pages() {
        let word = "lorem ";
        let text = word.repeat(1000);
        // 1000 words / 500 per page = 2; 6000 chars / 3000 per page = 2.
        assert_eq!(estimate_from_text(&text), 2);
    }

    #[test]
    fn docx_uses_the_heuristic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"not really a docx").unwrap();
        let text = "word ".repeat(1000);
        assert_eq!(count_pages(&path, FileType::Docx, &text), 2);
    }

    #[test]
    fn pptx_counts_slide_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for i in 1..=4 {
            zip.start_file(format!("ppt/slides/slide{i}.xml"), options)
                .unwrap();
            zip.write_all(b"<p:sld/>").unwrap();
        }
        zip.finish().unwrap();

        assert_eq!(count_pages(&path, FileType::Pptx, ""), 4);
    }

    #[test]
    fn xlsx_reports_one_page_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(
            &path,
            crate::extract::workbook_bytes(&[("Q1", "a"), ("Q2", "b"), ("Q3", "c")]),
        )
        .unwrap();

        assert_eq!(count_pages(&path, FileType::Xlsx, ""), 3);
    }

    #[test]
    fn unreadable_container_falls_back_to_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, b"garbage").unwrap();
        assert_eq!(count_pages(&path, FileType::Pptx, "tiny text"), 1);
    }
}
