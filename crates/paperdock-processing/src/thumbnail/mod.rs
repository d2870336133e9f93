//! Thumbnail rendering.
//!
//! PDFs get a real first-page preview when one is embedded; the other
//! formats get a stylized mockup (page, slide, or grid) drawn from the
//! extracted content. Rendering problems never escape this module: anything
//! that cannot be drawn collapses to the format badge card, so the pipeline
//! always has a JPEG to upload.

mod canvas;

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use tokio::task;
use tracing::debug;

use paperdock_core::models::FileType;

use crate::extract::embedded_page_images;

use canvas::{
    accent, draw_label, draw_label_centered, draw_text_bars, fill_rect, label_height,
    label_width, outline_rect, BACKDROP, BAR_GREY, PAGE_BORDER, TEXT_DARK, TEXT_LIGHT, WHITE,
};

const PAGE_W: u32 = 600;
const PAGE_H: u32 = 800;
const SLIDE_W: u32 = 800;
const SLIDE_H: u32 = 600;

const GRID_ROWS: usize = 8;
const GRID_COLS: usize = 5;

/// How much extracted text participates in mockups. Bars only need the
/// opening of the document.
const MOCKUP_TEXT_CHARS: usize = 1500;

/// Produces the document preview JPEG. The seam exists so the pipeline can
/// take any renderer; [`ThumbnailRenderer`] is the real one.
#[async_trait]
pub trait ThumbnailEngine: Send + Sync {
    async fn render(
        &self,
        source: &Path,
        out_path: &Path,
        file_type: FileType,
        text: &str,
        page_count: i32,
        file_size: i64,
    ) -> std::io::Result<()>;
}

pub struct ThumbnailRenderer {
    jpeg_quality: u8,
}

impl Default for ThumbnailRenderer {
    fn default() -> Self {
        Self { jpeg_quality: 80 }
    }
}

impl ThumbnailRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a thumbnail for `source` into `out_path` as JPEG. The only
    /// error surface left is writing the output file.
    pub async fn render(
        &self,
        source: &Path,
        out_path: &Path,
        file_type: FileType,
        text: &str,
        page_count: i32,
        file_size: i64,
    ) -> std::io::Result<()> {
        let source: PathBuf = source.to_owned();
        let out_path: PathBuf = out_path.to_owned();
        let text: String = text.chars().take(MOCKUP_TEXT_CHARS).collect();
        let quality = self.jpeg_quality;

        task::spawn_blocking(move || {
            let img = compose(&source, file_type, &text, page_count, file_size);
            save_jpeg(&img, &out_path, quality)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

#[async_trait]
impl ThumbnailEngine for ThumbnailRenderer {
    async fn render(
        &self,
        source: &Path,
        out_path: &Path,
        file_type: FileType,
        text: &str,
        page_count: i32,
        file_size: i64,
    ) -> std::io::Result<()> {
        ThumbnailRenderer::render(self, source, out_path, file_type, text, page_count, file_size)
            .await
    }
}

fn compose(source: &Path, file_type: FileType, text: &str, page_count: i32, file_size: i64) -> RgbImage {
    let rendered = match file_type {
        FileType::Pdf => pdf_preview(source),
        FileType::Docx => (!text.trim().is_empty()).then(|| page_mockup(file_type, text)),
        FileType::Pptx => Some(slide_mockup(file_type, page_count)),
        FileType::Xlsx | FileType::Csv => {
            read_grid(source, file_type).map(|rows| grid_mockup(file_type, &rows))
        }
    };
    rendered.unwrap_or_else(|| {
        debug!(file_type = %file_type, "no preview source, rendering badge card");
        badge_card(file_type, page_count, file_size)
    })
}

fn save_jpeg(img: &RgbImage, out_path: &Path, quality: u8) -> std::io::Result<()> {
    let file = std::fs::File::create(out_path)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    encoder.encode_image(img).map_err(std::io::Error::other)
}

/// First embedded page image of a scanned PDF, letterboxed onto the page
/// canvas. Text-only PDFs have no embedded image and fall through to the
/// badge card.
fn pdf_preview(source: &Path) -> Option<RgbImage> {
    let bytes = embedded_page_images(source, 1).ok()?.into_iter().next()?;
    let page = image::load_from_memory(&bytes).ok()?;
    let scaled = page.resize(PAGE_W, PAGE_H, FilterType::Triangle).to_rgb8();

    let mut img = RgbImage::from_pixel(PAGE_W, PAGE_H, WHITE);
    let x = (PAGE_W - scaled.width()) / 2;
    let y = (PAGE_H - scaled.height()) / 2;
    image::imageops::overlay(&mut img, &scaled, x as i64, y as i64);
    Some(img)
}

/// A white page with an accent title band and grey bars standing in for the
/// opening paragraphs.
fn page_mockup(file_type: FileType, text: &str) -> RgbImage {
    let mut img = RgbImage::from_pixel(PAGE_W, PAGE_H, WHITE);
    outline_rect(&mut img, 0, 0, PAGE_W, PAGE_H, PAGE_BORDER);

    let margin = 48;
    fill_rect(&mut img, margin, 56, (PAGE_W as f32 * 0.55) as u32, 20, accent(file_type));
    fill_rect(&mut img, margin, 92, (PAGE_W as f32 * 0.35) as u32, 10, BAR_GREY);

    draw_text_bars(
        &mut img,
        text,
        margin,
        140,
        PAGE_W - 2 * margin as u32,
        30,
        BAR_GREY,
    );
    img
}

/// A slide frame on a backdrop, with the slide count in the corner.
fn slide_mockup(file_type: FileType, slide_count: i32) -> RgbImage {
    let mut img = RgbImage::from_pixel(SLIDE_W, SLIDE_H, BACKDROP);

    let (x, y, w, h) = (60, 60, SLIDE_W - 120, SLIDE_H - 120);
    fill_rect(&mut img, x, y, w, h, WHITE);
    outline_rect(&mut img, x, y, w, h, PAGE_BORDER);
    fill_rect(&mut img, x + 40, y + 48, (w as f32 * 0.5) as u32, 26, accent(file_type));
    for (i, frac) in [0.62, 0.55, 0.48].iter().enumerate() {
        fill_rect(
            &mut img,
            x + 40,
            y + 120 + (i as i32 * 34),
            (w as f32 * frac) as u32,
            12,
            BAR_GREY,
        );
    }

    if slide_count > 0 {
        let label = format!("{slide_count} SLIDES");
        let lw = label_width(&label, 2);
        draw_label(
            &mut img,
            &label,
            (SLIDE_W - lw) as i32 - 70,
            (SLIDE_H - 100) as i32,
            2,
            TEXT_LIGHT,
        );
    }
    img
}

/// Spreadsheet grid with the real leading cell values, uppercased into the
/// built-in font.
fn grid_mockup(file_type: FileType, rows: &[Vec<String>]) -> RgbImage {
    let mut img = RgbImage::from_pixel(SLIDE_W, SLIDE_H, WHITE);
    outline_rect(&mut img, 0, 0, SLIDE_W, SLIDE_H, PAGE_BORDER);

    let col_w = SLIDE_W / GRID_COLS as u32;
    let row_h = SLIDE_H / (GRID_ROWS as u32 + 1);

    fill_rect(&mut img, 0, 0, SLIDE_W, row_h, accent(file_type));
    for (r, row) in rows.iter().take(GRID_ROWS + 1).enumerate() {
        let y = r as u32 * row_h;
        if r > 0 {
            fill_rect(&mut img, 0, y as i32, SLIDE_W, 1, PAGE_BORDER);
        }
        for (c, cell) in row.iter().take(GRID_COLS).enumerate() {
            let clipped: String = cell.chars().take(9).collect();
            let color = if r == 0 { WHITE } else { TEXT_DARK };
            draw_label(
                &mut img,
                &clipped,
                (c as u32 * col_w + 10) as i32,
                (y + (row_h - label_height(2)) / 2) as i32,
                2,
                color,
            );
        }
    }
    for c in 1..GRID_COLS as u32 {
        fill_rect(&mut img, (c * col_w) as i32, 0, 1, SLIDE_H, PAGE_BORDER);
    }
    img
}

/// The universal fallback: a page silhouette with a format badge, page count
/// and size. Also the "preview unavailable" face of the feature.
fn badge_card(file_type: FileType, page_count: i32, file_size: i64) -> RgbImage {
    let mut img = RgbImage::from_pixel(PAGE_W, PAGE_H, BACKDROP);

    let (x, y, w, h) = (90, 70, PAGE_W - 180, PAGE_H - 140);
    fill_rect(&mut img, x, y, w, h, WHITE);
    outline_rect(&mut img, x, y, w, h, PAGE_BORDER);

    let ext = file_type.extension().to_uppercase();
    let badge_w = label_width(&ext, 4) + 48;
    let badge_x = x + ((w - badge_w) / 2) as i32;
    fill_rect(&mut img, badge_x, y + 150, badge_w, 76, accent(file_type));
    draw_label_centered(&mut img, &ext, badge_x, badge_w, y + 174, 4, WHITE);

    if page_count > 0 {
        let pages = format!(
            "{page_count} {}",
            if page_count == 1 { "PAGE" } else { "PAGES" }
        );
        draw_label_centered(&mut img, &pages, x, w, y + 300, 2, TEXT_DARK);
    }
    draw_label_centered(&mut img, &format_size(file_size), x, w, y + 340, 2, TEXT_LIGHT);
    img
}

fn read_grid(source: &Path, file_type: FileType) -> Option<Vec<Vec<String>>> {
    match file_type {
        FileType::Xlsx => {
            use calamine::{open_workbook, Data, Reader, Xlsx};
            let mut workbook: Xlsx<_> = open_workbook(source).ok()?;
            let name = workbook.sheet_names().first()?.to_owned();
            let range = workbook.worksheet_range(&name).ok()?;
            let rows: Vec<Vec<String>> = range
                .rows()
                .take(GRID_ROWS + 1)
                .map(|row| {
                    row.iter()
                        .take(GRID_COLS)
                        .map(|c| match c {
                            Data::Empty => String::new(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .collect();
            (!rows.is_empty()).then_some(rows)
        }
        FileType::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(source)
                .ok()?;
            let mut rows = Vec::new();
            for record in reader.records().take(GRID_ROWS + 1) {
                let record = record.ok()?;
                rows.push(record.iter().map(|s| s.to_string()).collect());
            }
            (!rows.is_empty()).then_some(rows)
        }
        _ => None,
    }
}

fn format_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes.max(0) as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{bytes:.0} B")
    }
}
