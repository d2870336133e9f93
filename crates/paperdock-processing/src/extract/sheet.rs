//! Spreadsheet extraction: every sheet flattened to CSV-ish text.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use paperdock_core::models::FileType;

use super::ExtractionError;

pub(crate) fn extract_xlsx(path: &Path) -> Result<String, ExtractionError> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| ExtractionError::parse(FileType::Xlsx, e))?;

    let mut out = String::new();
    for name in workbook.sheet_names().to_owned() {
        let Ok(range) = workbook.worksheet_range(&name) else {
            continue;
        };
        out.push_str(&format!("=== {name} ===\n"));
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(cell_to_string).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Builds a minimal real workbook: one inline-string cell per named sheet.
#[cfg(test)]
pub(crate) fn workbook_bytes(sheets: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();

        let mut sheet_tags = String::new();
        let mut rels = String::new();
        for (i, (name, _)) in sheets.iter().enumerate() {
            let n = i + 1;
            sheet_tags.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
        }

        zip.start_file("xl/workbook.xml", options).unwrap();
        write!(
            zip,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_tags}</sheets></workbook>"#
        )
        .unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        write!(
            zip,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .unwrap();

        for (i, (_, cell)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .unwrap();
            write!(
                zip,
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>{cell}</t></is></c></row></sheetData></worksheet>"#
            )
            .unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_render_as_empty_strings() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_to_string(&Data::String("x".into())), "x");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn sheets_are_flattened_under_name_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(
            &path,
            workbook_bytes(&[("Revenue", "north region"), ("Costs", "logistics")]),
        )
        .unwrap();

        let text = extract_xlsx(&path).unwrap();
        assert!(text.contains("=== Revenue ===\nnorth region\n"));
        assert!(text.contains("=== Costs ===\nlogistics\n"));
    }
}
