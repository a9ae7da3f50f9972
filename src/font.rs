//! 5x8 bitmap glyphs for raster text.

use crate::chart::Rgb;
use image::{Rgb as Pixel, RgbImage};

pub const GLYPH_SIZE: u32 = 8;

/// Glyph rows, most significant bit leftmost. Characters without a glyph
/// are drawn as `?`.
fn glyph(c: char) -> [u8; 8] {
    match c {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '\'' => [0x20, 0x20, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x00, 0x00, 0x00, 0xF8, 0x00, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x00],
        '0' => [0x70, 0x88, 0x98, 0xA8, 0xC8, 0x88, 0x70, 0x00],
        '1' => [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00],
        '2' => [0x70, 0x88, 0x08, 0x30, 0x40, 0x80, 0xF8, 0x00],
        '3' => [0xF8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00],
        '4' => [0x10, 0x30, 0x50, 0x90, 0xF8, 0x10, 0x10, 0x00],
        '5' => [0xF8, 0x80, 0xF0, 0x08, 0x08, 0x88, 0x70, 0x00],
        '6' => [0x30, 0x40, 0x80, 0xF0, 0x88, 0x88, 0x70, 0x00],
        '7' => [0xF8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00],
        '8' => [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00],
        '9' => [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00],
        'A' => [0x70, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00],
        'B' => [0xF0, 0x88, 0x88, 0xF0, 0x88, 0x88, 0xF0, 0x00],
        'C' => [0x70, 0x88, 0x80, 0x80, 0x80, 0x88, 0x70, 0x00],
        'D' => [0xE0, 0x90, 0x88, 0x88, 0x88, 0x90, 0xE0, 0x00],
        'E' => [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0xF8, 0x00],
        'F' => [0xF8, 0x80, 0x80, 0xF0, 0x80, 0x80, 0x80, 0x00],
        'G' => [0x70, 0x88, 0x80, 0xB8, 0x88, 0x88, 0x70, 0x00],
        'H' => [0x88, 0x88, 0x88, 0xF8, 0x88, 0x88, 0x88, 0x00],
        'I' => [0x70, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00],
        'J' => [0x38, 0x10, 0x10, 0x10, 0x10, 0x90, 0x60, 0x00],
        'K' => [0x88, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x88, 0x00],
        'L' => [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0xF8, 0x00],
        'M' => [0x88, 0xD8, 0xA8, 0xA8, 0x88, 0x88, 0x88, 0x00],
        'N' => [0x88, 0xC8, 0xA8, 0x98, 0x88, 0x88, 0x88, 0x00],
        'O' => [0x70, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00],
        'P' => [0xF0, 0x88, 0x88, 0xF0, 0x80, 0x80, 0x80, 0x00],
        'Q' => [0x70, 0x88, 0x88, 0x88, 0xA8, 0x90, 0x68, 0x00],
        'R' => [0xF0, 0x88, 0x88, 0xF0, 0xA0, 0x90, 0x88, 0x00],
        'S' => [0x70, 0x88, 0x80, 0x70, 0x08, 0x88, 0x70, 0x00],
        'T' => [0xF8, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00],
        'U' => [0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00],
        'V' => [0x88, 0x88, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00],
        'W' => [0x88, 0x88, 0x88, 0xA8, 0xA8, 0xD8, 0x88, 0x00],
        'X' => [0x88, 0x88, 0x50, 0x20, 0x50, 0x88, 0x88, 0x00],
        'Y' => [0x88, 0x88, 0x50, 0x20, 0x20, 0x20, 0x20, 0x00],
        'Z' => [0xF8, 0x08, 0x10, 0x20, 0x40, 0x80, 0xF8, 0x00],
        'a' => [0x00, 0x00, 0x70, 0x08, 0x78, 0x88, 0x78, 0x00],
        'b' => [0x80, 0x80, 0xB0, 0xC8, 0x88, 0x88, 0xF0, 0x00],
        'c' => [0x00, 0x00, 0x70, 0x80, 0x80, 0x88, 0x70, 0x00],
        'd' => [0x08, 0x08, 0x68, 0x98, 0x88, 0x88, 0x78, 0x00],
        'e' => [0x00, 0x00, 0x70, 0x88, 0xF8, 0x80, 0x70, 0x00],
        'f' => [0x30, 0x48, 0x40, 0xE0, 0x40, 0x40, 0x40, 0x00],
        'g' => [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x70, 0x00],
        'h' => [0x80, 0x80, 0xB0, 0xC8, 0x88, 0x88, 0x88, 0x00],
        'i' => [0x20, 0x00, 0x60, 0x20, 0x20, 0x20, 0x70, 0x00],
        'j' => [0x10, 0x00, 0x30, 0x10, 0x10, 0x90, 0x60, 0x00],
        'k' => [0x80, 0x80, 0x90, 0xA0, 0xC0, 0xA0, 0x90, 0x00],
        'l' => [0x60, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00],
        'm' => [0x00, 0x00, 0xD0, 0xA8, 0xA8, 0xA8, 0xA8, 0x00],
        'n' => [0x00, 0x00, 0xB0, 0xC8, 0x88, 0x88, 0x88, 0x00],
        'o' => [0x00, 0x00, 0x70, 0x88, 0x88, 0x88, 0x70, 0x00],
        'p' => [0x00, 0x00, 0xF0, 0x88, 0xF0, 0x80, 0x80, 0x00],
        'q' => [0x00, 0x00, 0x78, 0x88, 0x78, 0x08, 0x08, 0x00],
        'r' => [0x00, 0x00, 0xB0, 0xC8, 0x80, 0x80, 0x80, 0x00],
        's' => [0x00, 0x00, 0x70, 0x80, 0x70, 0x08, 0xF0, 0x00],
        't' => [0x40, 0x40, 0xE0, 0x40, 0x40, 0x48, 0x30, 0x00],
        'u' => [0x00, 0x00, 0x88, 0x88, 0x88, 0x98, 0x68, 0x00],
        'v' => [0x00, 0x00, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00],
        'w' => [0x00, 0x00, 0x88, 0x88, 0xA8, 0xA8, 0x50, 0x00],
        'x' => [0x00, 0x00, 0x88, 0x50, 0x20, 0x50, 0x88, 0x00],
        'y' => [0x00, 0x00, 0x88, 0x88, 0x78, 0x08, 0x70, 0x00],
        'z' => [0x00, 0x00, 0xF8, 0x10, 0x20, 0x40, 0xF8, 0x00],
        _ => [0x70, 0x88, 0x08, 0x10, 0x20, 0x00, 0x20, 0x00],
    }
}

/// Pixel width of `text` drawn at `scale` pixels per glyph dot.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale
}

/// Draw `text` with its top-left corner at (`x`, `y`). Dots falling outside
/// the image are skipped.
pub fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
    let scale = scale.max(1) as i64;
    let pixel = Pixel([color.0, color.1, color.2]);
    let (width, height) = (img.width() as i64, img.height() as i64);

    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c);
        let base_x = x + i as i64 * GLYPH_SIZE as i64 * scale;
        for (j, row) in rows.iter().enumerate() {
            for bit in 0..8i64 {
                if (row >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let dot_x = base_x + bit * scale;
                let dot_y = y + j as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (px, py) = (dot_x + dx, dot_y + dy);
                        if px >= 0 && py >= 0 && px < width && py < height {
                            img.put_pixel(px as u32, py as u32, pixel);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_scales_with_length() {
        assert_eq!(text_width("42", 1), 16);
        assert_eq!(text_width("42", 3), 48);
        assert_eq!(text_width("", 2), 0);
    }

    #[test]
    fn draws_glyph_dots() {
        let mut img = RgbImage::new(16, 8);
        draw_text(&mut img, 0, 0, "1", 1, (255, 255, 255));
        // '1' has its stem in column 2 of every glyph row
        assert_eq!(img.get_pixel(2, 2), &Pixel([255, 255, 255]));
        assert_eq!(img.get_pixel(0, 2), &Pixel([0, 0, 0]));
    }

    #[test]
    fn clips_outside_image() {
        let mut img = RgbImage::new(4, 4);
        draw_text(&mut img, -6, -3, "Hydro 16", 2, (1, 2, 3));
    }

    #[test]
    fn unknown_characters_fall_back() {
        assert_eq!(glyph('é'), glyph('?'));
        assert_ne!(glyph('A'), glyph('?'));
    }
}
