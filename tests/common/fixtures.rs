use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Rgb};
use plantscan::{OverlayRenderer, OverlayStyle, RawDetection, SeverityClassifier};
use tempfile::NamedTempFile;

/// Background color of generated test images.
pub const TEST_GREEN: Rgb<u8> = Rgb([40, 120, 40]);

pub const SEVERE_RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const MODERATE_ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
pub const MILD_YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// Solid-color RGB image of the given size.
pub fn solid_image(width: u32, height: u32, color: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, color))
}

/// Gradient image, so that pixel-identity checks are not trivially satisfied.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    }))
}

/// Saves `image` as a temporary PNG, keeping its color type.
pub fn save_temp_png(image: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    image
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Creates a green PNG test image and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image(width: u32, height: u32) -> NamedTempFile {
    save_temp_png(&solid_image(width, height, TEST_GREEN))
}

/// Writes raw detections as a replay file inside `dir`.
pub fn write_replay_file(dir: &Path, results: &[RawDetection]) -> PathBuf {
    let path = dir.join("model.json");
    std::fs::write(&path, serde_json::to_string(results).expect("serialize"))
        .expect("Failed to write replay file");
    path
}

/// Renderer with the built-in font so output does not depend on installed fonts.
pub fn test_renderer() -> OverlayRenderer {
    OverlayRenderer::new(
        SeverityClassifier::default(),
        OverlayStyle {
            font_path: None,
            ..OverlayStyle::default()
        },
    )
}

pub fn raw(bbox: [f64; 4], class_id: i64, confidence: f64) -> RawDetection {
    RawDetection::new(bbox, class_id, confidence)
}
