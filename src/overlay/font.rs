use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, Rgba};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::debug;

const GLYPH_CELLS: u32 = 8;

/// Font used for box captions.
///
/// Either a scalable font loaded from disk or the built-in 8x8 bitmap font,
/// magnified to roughly the requested pixel size.
pub enum LabelFont {
    Outline { font: FontVec, scale: PxScale },
    Builtin { magnify: u32 },
}

impl LabelFont {
    /// Load the preferred font file, falling back to the built-in font.
    ///
    /// Never fails: a missing or unreadable font file only changes how
    /// captions look.
    pub fn acquire(preferred: Option<&Path>, size: f32) -> Self {
        let Some(path) = preferred else {
            return Self::builtin(size);
        };

        let loaded = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()));

        match loaded {
            Ok(font) => {
                debug!("using label font {}", path.display());
                Self::Outline {
                    font,
                    scale: PxScale::from(size),
                }
            }
            Err(e) => {
                debug!(
                    "label font {} unavailable ({}), using built-in font",
                    path.display(),
                    e
                );
                Self::builtin(size)
            }
        }
    }

    /// Built-in 8x8 font magnified to the nearest whole multiple of `size`.
    pub fn builtin(size: f32) -> Self {
        let magnify = (size / GLYPH_CELLS as f32).round().max(1.0) as u32;
        Self::Builtin { magnify }
    }

    /// Whether captions fall back to the bitmap font.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    /// Rendered extent `(width, height)` of `text` in pixels.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Outline { font, scale } => {
                // Full line height, so descenders stay on the background
                let scaled = font.as_scaled(*scale);
                let height = (scaled.ascent() - scaled.descent()).ceil() as u32;
                // text_size truncates the advance width
                let (width, _) = text_size(*scale, font, text);
                (width + 1, height)
            }
            Self::Builtin { magnify } => {
                let cell = GLYPH_CELLS * magnify;
                (text.chars().count() as u32 * cell, cell)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels falling
    /// outside the canvas are skipped.
    pub fn draw(&self, canvas: &mut DynamicImage, color: Rgba<u8>, x: i32, y: i32, text: &str) {
        match self {
            Self::Outline { font, scale } => draw_text_mut(canvas, color, x, y, *scale, font, text),
            Self::Builtin { magnify } => draw_bitmap_text(canvas, color, x, y, *magnify, text),
        }
    }
}

fn draw_bitmap_text(
    canvas: &mut DynamicImage,
    color: Rgba<u8>,
    x: i32,
    y: i32,
    magnify: u32,
    text: &str,
) {
    let advance = (GLYPH_CELLS * magnify) as i32;

    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as i32 * advance;

        // Each byte is one row, least significant bit leftmost
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_CELLS {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let px = origin_x + (col * magnify) as i32;
                let py = y + (row as u32 * magnify) as i32;
                draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(magnify, magnify), color);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use image::Rgb;

    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// A scalable font installed on the machine running the tests, if any.
    pub(crate) fn system_font() -> Option<PathBuf> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/Library/Fonts/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
    }

    /// Draw `text` at (4, 4) and check every lit pixel is inside its extent.
    fn assert_drawn_inside_extent(font: &LabelFont, text: &str) {
        let (w, h) = font.text_size(text);
        let mut canvas = DynamicImage::new_rgb8(w + 8, h + 8);
        font.draw(&mut canvas, WHITE, 4, 4, text);

        let mut lit = 0;
        for (x, y, p) in canvas.to_rgb8().enumerate_pixels() {
            if *p != Rgb([0, 0, 0]) {
                lit += 1;
                assert!(
                    (4..4 + w).contains(&x) && (4..4 + h).contains(&y),
                    "pixel ({x}, {y}) outside {w}x{h} extent"
                );
            }
        }
        assert!(lit > 0);
    }

    #[test]
    fn missing_font_falls_back_to_builtin() {
        let font = LabelFont::acquire(Some(Path::new("/nonexistent/font.ttf")), 16.0);
        assert!(font.is_builtin());
        assert_eq!(font.text_size("abc"), (48, 16));
    }

    #[test]
    fn garbage_font_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(LabelFont::acquire(Some(&path), 16.0).is_builtin());
    }

    #[test]
    fn builtin_draws_inside_its_extent() {
        assert_drawn_inside_extent(&LabelFont::builtin(8.0), "A");
    }

    #[test]
    fn preferred_font_is_used_when_readable() {
        let Some(path) = system_font() else {
            eprintln!("no scalable system font installed, skipping");
            return;
        };
        let font = LabelFont::acquire(Some(&path), 16.0);
        assert!(!font.is_builtin());

        let (_, h) = font.text_size("Unknown (0.50)");
        assert!((16..=17).contains(&h), "line height {h}");
        assert_drawn_inside_extent(&font, "Unknown (0.50)");
        assert_drawn_inside_extent(&font, "Gypsy blight (0.99)");
    }

    #[test]
    fn builtin_clips_off_canvas_text() {
        let font = LabelFont::builtin(16.0);
        let mut canvas = DynamicImage::new_rgb8(10, 10);
        font.draw(&mut canvas, WHITE, -5, -12, "Unknown (0.50)");
    }
}
