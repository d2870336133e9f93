//! Drawing primitives for thumbnail mockups.
//!
//! Labels use a built-in 5x7 pixel font (uppercase, digits, and a few
//! punctuation marks) so no font asset has to ship with the binary; body text
//! is suggested with proportional grey bars rather than rendered glyphs.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use paperdock_core::models::FileType;

pub(crate) const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub(crate) const PAGE_BORDER: Rgb<u8> = Rgb([208, 208, 208]);
pub(crate) const BACKDROP: Rgb<u8> = Rgb([236, 238, 241]);
pub(crate) const TEXT_DARK: Rgb<u8> = Rgb([66, 66, 66]);
pub(crate) const TEXT_LIGHT: Rgb<u8> = Rgb([158, 158, 158]);
pub(crate) const BAR_GREY: Rgb<u8> = Rgb([189, 189, 189]);

/// Brand-ish accent color per format, used for badges and header bands.
pub(crate) fn accent(file_type: FileType) -> Rgb<u8> {
    match file_type {
        FileType::Pdf => Rgb([211, 47, 47]),
        FileType::Docx => Rgb([25, 118, 210]),
        FileType::Pptx => Rgb([230, 81, 0]),
        FileType::Xlsx => Rgb([46, 125, 50]),
        FileType::Csv => Rgb([0, 121, 107]),
    }
}

pub(crate) fn fill_rect(img: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    draw_filled_rect_mut(img, Rect::at(x, y).of_size(w, h), color);
}

pub(crate) fn outline_rect(img: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
    fill_rect(img, x, y, w, 1, color);
    fill_rect(img, x, y + h as i32 - 1, w, 1, color);
    fill_rect(img, x, y, 1, h, color);
    fill_rect(img, x + w as i32 - 1, y, 1, h, color);
}

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Row bitmaps for the 5x7 font, low 5 bits per row, MSB leftmost.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        _ => [0x00; 7],
    }
}

pub(crate) fn label_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    chars * (GLYPH_W + 1) * scale - scale
}

pub(crate) fn label_height(scale: u32) -> u32 {
    GLYPH_H * scale
}

/// Draw `text` with its top-left corner at (x, y). Characters outside the
/// font's repertoire render as blanks.
pub(crate) fn draw_label(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    scale: u32,
    color: Rgb<u8>,
) {
    let mut cursor = x;
    for c in text.chars() {
        let rows = glyph(c);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                    fill_rect(
                        img,
                        cursor + (col * scale) as i32,
                        y + (row as u32 * scale) as i32,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        cursor += ((GLYPH_W + 1) * scale) as i32;
    }
}

/// Draw `text` centered horizontally within [x, x + w).
pub(crate) fn draw_label_centered(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    w: u32,
    y: i32,
    scale: u32,
    color: Rgb<u8>,
) {
    let tw = label_width(text, scale);
    let offset = (w.saturating_sub(tw) / 2) as i32;
    draw_label(img, text, x + offset, y, scale, color);
}

/// Suggest body text with one grey bar per word, wrapped to the region width.
/// Returns the y coordinate after the last drawn line.
pub(crate) fn draw_text_bars(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    region_w: u32,
    max_lines: usize,
    color: Rgb<u8>,
) -> i32 {
    const BAR_H: u32 = 8;
    const LINE_GAP: u32 = 8;
    const WORD_GAP: u32 = 6;
    const PX_PER_CHAR: u32 = 7;

    let mut cx = x;
    let mut cy = y;
    let mut lines = 0usize;
    for word in text.split_whitespace() {
        let w = (word.chars().count() as u32 * PX_PER_CHAR).clamp(PX_PER_CHAR, region_w);
        if cx + w as i32 > x + region_w as i32 {
            cx = x;
            cy += (BAR_H + LINE_GAP) as i32;
            lines += 1;
            if lines >= max_lines {
                break;
            }
        }
        fill_rect(img, cx, cy, w, BAR_H, color);
        cx += (w + WORD_GAP) as i32;
    }
    cy + (BAR_H + LINE_GAP) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_width_scales_linearly() {
        assert_eq!(label_width("", 2), 0);
        assert_eq!(label_width("AB", 1), 11);
        assert_eq!(label_width("AB", 2), 22);
    }

    #[test]
    fn draw_label_marks_pixels() {
        let mut img = RgbImage::from_pixel(64, 16, WHITE);
        draw_label(&mut img, "PDF", 2, 2, 1, TEXT_DARK);
        let inked = img.pixels().filter(|p| **p == TEXT_DARK).count();
        assert!(inked > 20, "expected glyph pixels, got {inked}");
    }

    #[test]
    fn text_bars_wrap_within_region() {
        let mut img = RgbImage::from_pixel(100, 200, WHITE);
        let end = draw_text_bars(&mut img, &"word ".repeat(40), 10, 10, 80, 5, BAR_GREY);
        assert!(end > 10);
        // Nothing drawn outside the region's right edge.
        for y in 0..200 {
            for x in 91..100 {
                assert_eq!(img.get_pixel(x, y), &WHITE);
            }
        }
    }

    #[test]
    fn every_format_has_a_distinct_accent() {
        let colors: Vec<_> = FileType::ALL.iter().map(|ft| accent(*ft)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
