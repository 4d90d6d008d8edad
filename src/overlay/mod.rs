pub mod font;

use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat, Pixel, Rgb, Rgba};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::{debug, info};

use crate::error::RenderError;
use crate::geometry::denormalize;
use crate::models::Detection;
use crate::severity::SeverityClassifier;

pub use font::LabelFont;

/// Drawing parameters that do not depend on the detections.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Box outline width in pixels, growing inward from the box edge.
    pub stroke_width: u32,
    /// Preferred caption font. The built-in font is used when this is
    /// `None` or cannot be loaded.
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub text_color: Rgb<u8>,
    pub jpeg_quality: u8,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_width: 2,
            font_path: Some(PathBuf::from("arial.ttf")),
            font_size: 16.0,
            text_color: Rgb([0, 0, 0]),
            jpeg_quality: 95,
        }
    }
}

/// Draws detections onto a copy of an image, colored by severity.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    classifier: SeverityClassifier,
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(classifier: SeverityClassifier, style: OverlayStyle) -> Self {
        Self { classifier, style }
    }

    /// Get the classifier that picks box colors
    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    /// Render `detections` in order onto a copy of `base`.
    ///
    /// The copy keeps the color type of `base`, so alpha and bit depth
    /// survive. Later detections paint over earlier ones, the base image is
    /// left untouched, and an empty list returns an unmodified copy.
    pub fn render(
        &self,
        base: &DynamicImage,
        detections: &[Detection],
    ) -> Result<DynamicImage, RenderError> {
        let mut canvas = base.clone();
        if detections.is_empty() {
            return Ok(canvas);
        }

        let font = LabelFont::acquire(self.style.font_path.as_deref(), self.style.font_size);
        for detection in detections {
            self.draw_detection(&mut canvas, &font, detection)?;
        }

        debug!(
            "rendered {} detections on {}x{} {:?} image ({} font)",
            detections.len(),
            canvas.width(),
            canvas.height(),
            canvas.color(),
            if font.is_builtin() { "built-in" } else { "outline" }
        );
        Ok(canvas)
    }

    fn draw_detection(
        &self,
        canvas: &mut DynamicImage,
        font: &LabelFont,
        detection: &Detection,
    ) -> Result<(), RenderError> {
        let px = denormalize(detection.bbox(), canvas.width(), canvas.height())?;
        let tier = self.classifier.classify(detection.confidence());
        let color = self.classifier.color(tier).to_rgba();

        let (x1, y1, x2, y2) = px.to_rect_corners();
        draw_outline(canvas, (x1, y1, x2, y2), self.style.stroke_width, color);

        // Caption sits on top of the box, bottom edge touching the box's top
        // edge. Boxes near y=0 push it partly off the image; it is not clamped.
        let caption = detection.caption();
        let (text_w, text_h) = font.text_size(&caption);
        if text_w > 0 && text_h > 0 {
            let top = y1 - text_h as i32;
            draw_filled_rect_mut(canvas, Rect::at(x1, top).of_size(text_w, text_h), color);
            font.draw(canvas, self.style.text_color.to_rgba(), x1, top, &caption);
        }

        debug!("drew '{}' ({}) at ({}, {})-({}, {})", caption, tier, x1, y1, x2, y2);
        Ok(())
    }

    /// Encode `canvas` in the format implied by the extension of `output`.
    ///
    /// The image is fully encoded before anything touches disk, and a failed
    /// write removes whatever was written.
    pub fn save(&self, canvas: &DynamicImage, output: &Path) -> Result<(), RenderError> {
        let format = ImageFormat::from_path(output)
            .map_err(|_| RenderError::UnsupportedFormat(output.to_path_buf()))?;

        let mut encoded = Vec::new();
        let written = match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut encoded, self.style.jpeg_quality);
                jpeg_compatible(canvas).write_with_encoder(encoder)
            }
            _ => canvas.write_to(&mut Cursor::new(&mut encoded), format),
        };
        written.map_err(RenderError::Encode)?;

        if let Err(source) = fs::write(output, &encoded) {
            let _ = fs::remove_file(output);
            return Err(RenderError::Io {
                path: output.to_path_buf(),
                source,
            });
        }

        info!("saved overlay to {}", output.display());
        Ok(())
    }

    /// Load `image_path`, draw `detections` on it and save to `output`.
    pub fn render_file(
        &self,
        image_path: &Path,
        detections: &[Detection],
        output: &Path,
    ) -> Result<(), RenderError> {
        let base = image::open(image_path).map_err(|source| RenderError::ImageLoad {
            path: image_path.to_path_buf(),
            source,
        })?;

        let canvas = self.render(&base, detections)?;
        self.save(&canvas, output)
    }
}

/// JPEG takes 8-bit gray or RGB; anything else is flattened to RGB8.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(image),
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

/// Hollow rectangle with inclusive corners, `stroke` pixels thick.
fn draw_outline(
    canvas: &mut DynamicImage,
    corners: (i32, i32, i32, i32),
    stroke: u32,
    color: Rgba<u8>,
) {
    let (x1, y1, x2, y2) = corners;
    let width = x2 - x1 + 1;
    let height = y2 - y1 + 1;

    for inset in 0..stroke as i32 {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
