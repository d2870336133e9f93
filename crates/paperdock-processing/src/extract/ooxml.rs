//! OOXML (DOCX/PPTX) extraction via the zip container and quick-xml.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use paperdock_core::models::FileType;

use super::ExtractionError;

pub(crate) fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let xml = read_zip_entry(path, "word/document.xml", FileType::Docx)?;
    Ok(collect_text_runs(&xml, "w:t", "w:p"))
}

/// Slide text lives across dozens of per-slide XML parts with layout-dependent
/// ordering; rather than produce scrambled text, PPTX gets a structural
/// summary and the downstream stages work from that.
pub(crate) fn extract_pptx(path: &Path) -> Result<String, ExtractionError> {
    let slides = pptx_slide_count(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "presentation".to_string());
    Ok(format!(
        "Presentation \"{stem}\" containing {slides} slide{}. \
         Full slide text extraction is not supported for this format.",
        if slides == 1 { "" } else { "s" }
    ))
}

pub(crate) fn pptx_slide_count(path: &Path) -> Result<usize, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractionError::parse(FileType::Pptx, e))?;
    let count = archive
        .file_names()
        .filter(|name| {
            name.starts_with("ppt/slides/slide") && name.ends_with(".xml")
        })
        .count();
    Ok(count)
}

fn read_zip_entry(
    path: &Path,
    entry: &str,
    format: FileType,
) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractionError::parse(format, e))?;
    let mut xml = String::new();
    archive
        .by_name(entry)
        .map_err(|e| ExtractionError::parse(format, e))?
        .read_to_string(&mut xml)?;
    Ok(xml)
}

/// Walk the XML stream collecting the character content of `text_tag`
/// elements, emitting a newline at each `para_tag` close.
fn collect_text_runs(xml: &str, text_tag: &str, para_tag: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == text_tag.as_bytes() => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == text_tag.as_bytes() => in_text = false,
            Ok(Event::End(e)) if e.name().as_ref() == para_tag.as_bytes() => out.push('\n'),
            Ok(Event::Text(t)) if in_text => {
                out.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn entities_in_text_runs_are_unescaped() {
        let text = collect_text_runs(
            r#"<w:document><w:body><w:p><w:r><w:t>Q&amp;A &lt;draft&gt;</w:t></w:r></w:p></w:body></w:document>"#,
            "w:t",
            "w:p",
        );
        assert_eq!(text.trim(), "Q&A <draft>");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let text = collect_text_runs(
            r#"<w:p><w:instrText>PAGEREF</w:instrText><w:r><w:t>kept</w:t></w:r></w:p>"#,
            "w:t",
            "w:p",
        );
        assert_eq!(text.trim(), "kept");
    }

    #[test]
    fn slide_count_matches_slide_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_zip(
            &path,
            &[
                ("ppt/slides/slide1.xml", "<p:sld/>"),
                ("ppt/slides/slide2.xml", "<p:sld/>"),
                ("ppt/slides/slide3.xml", "<p:sld/>"),
                ("ppt/slideLayouts/slideLayout1.xml", "<p:sldLayout/>"),
            ],
        );
        assert_eq!(pptx_slide_count(&path).unwrap(), 3);
    }

    #[test]
    fn pptx_summary_names_the_deck() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarterly-review.pptx");
        write_zip(&path, &[("ppt/slides/slide1.xml", "<p:sld/>")]);

        let text = extract_pptx(&path).unwrap();
        assert!(text.contains("quarterly-review"));
        assert!(text.contains("1 slide."));
    }

    #[test]
    fn missing_document_part_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hollow.docx");
        write_zip(&path, &[("word/styles.xml", "<w:styles/>")]);

        let err = extract_docx(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Parse { .. }));
    }
}
