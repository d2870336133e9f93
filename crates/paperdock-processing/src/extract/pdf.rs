//! PDF text extraction with an OCR fallback for scanned documents.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object};
use tokio::task;
use tracing::{debug, warn};

use paperdock_core::models::FileType;

use crate::ocr::OcrEngine;

use super::{ExtractionError, ExtractionMethod};

/// Below this many characters the text layer is considered absent and the
/// document treated as a scan.
const MIN_TEXT_LAYER_CHARS: usize = 50;

pub(crate) async fn extract_pdf(
    path: &Path,
    ocr: Option<&dyn OcrEngine>,
    max_ocr_pages: usize,
) -> Result<(String, ExtractionMethod), ExtractionError> {
    let text_layer = {
        let path = path.to_owned();
        task::spawn_blocking(move || pdf_extract::extract_text(&path))
            .await
            .map_err(|e| ExtractionError::Io(std::io::Error::other(e)))?
    };

    let text = match text_layer {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "pdf text layer extraction failed, treating as scanned");
            String::new()
        }
    };

    if text.trim().chars().count() >= MIN_TEXT_LAYER_CHARS {
        return Ok((text, ExtractionMethod::PdfTextLayer));
    }

    let Some(ocr) = ocr else {
        debug!("sparse pdf text layer and no OCR engine configured");
        return Ok((text, ExtractionMethod::PdfTextLayer));
    };

    let images = {
        let path: PathBuf = path.to_owned();
        task::spawn_blocking(move || embedded_page_images(&path, max_ocr_pages))
            .await
            .map_err(|e| ExtractionError::Io(std::io::Error::other(e)))?
    }?;

    if images.is_empty() {
        debug!("no embedded page images found for OCR");
        return Ok((text, ExtractionMethod::PdfTextLayer));
    }

    let mut recognized = String::new();
    for (i, image) in images.iter().enumerate() {
        match ocr.recognize(image).await {
            Ok(page_text) => {
                recognized.push_str(&page_text);
                recognized.push('\n');
            }
            Err(e) => warn!(page = i + 1, error = %e, "OCR failed for page image"),
        }
    }

    if recognized.trim().is_empty() {
        Ok((text, ExtractionMethod::PdfTextLayer))
    } else {
        debug!(pages = images.len(), chars = recognized.len(), "recovered text via OCR");
        Ok((recognized, ExtractionMethod::PdfOcr))
    }
}

/// Pull the JPEG page images out of the first `max_pages` pages. Scanned PDFs
/// typically carry one DCT-encoded XObject per page; other encodings are
/// skipped rather than transcoded.
pub(crate) fn embedded_page_images(
    path: &Path,
    max_pages: usize,
) -> Result<Vec<Vec<u8>>, ExtractionError> {
    let doc =
        Document::load(path).map_err(|e| ExtractionError::parse(FileType::Pdf, e))?;

    let mut images = Vec::new();
    for (_, page_id) in doc.get_pages().into_iter().take(max_pages) {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(resources) = dict_entry(&doc, page, b"Resources") else {
            continue;
        };
        let Some(xobjects) = dict_entry(&doc, resources, b"XObject") else {
            continue;
        };

        for (_, obj) in xobjects.iter() {
            let Some(Object::Stream(stream)) = resolve(&doc, obj) else {
                continue;
            };
            let subtype = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok());
            if subtype != Some(b"Image") || !has_dct_filter(&stream.dict) {
                continue;
            }
            images.push(stream.content.clone());
        }
    }
    Ok(images)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn has_dct_filter(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n.as_slice() == b"DCTDecode",
        Ok(Object::Array(items)) => items
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n.as_slice() == b"DCTDecode")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use lopdf::dictionary;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeOcr {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("recognized".to_string())
        }
    }

    fn text_pdf(body: &str) -> Vec<u8> {
        // A minimal single-page PDF with one text-showing content stream.
        let stream = format!("BT /F1 12 Tf 72 720 Td ({body}) Tj ET");
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(
            dictionary! {},
            stream.into_bytes(),
        )));
        let page_id = doc.new_object_id();
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn rich_text_layer_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(
            &path,
            text_pdf("A sufficiently long sentence that clears the scan detection floor."),
        )
        .unwrap();

        let ocr = FakeOcr {
            calls: AtomicUsize::new(0),
        };
        let (text, method) = extract_pdf(&path, Some(&ocr), 5).await.unwrap();
        assert!(text.contains("scan detection floor"));
        assert_eq!(method, ExtractionMethod::PdfTextLayer);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sparse_text_layer_without_images_returns_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.pdf");
        std::fs::write(&path, text_pdf("Hi")).unwrap();

        let ocr = FakeOcr {
            calls: AtomicUsize::new(0),
        };
        // No embedded images to OCR; the sparse layer comes back unchanged.
        let (text, method) = extract_pdf(&path, Some(&ocr), 5).await.unwrap();
        assert!(text.contains("Hi"));
        assert_eq!(method, ExtractionMethod::PdfTextLayer);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }
}
