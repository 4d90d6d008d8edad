mod replay;
mod stub;

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};

use crate::models::RawDetection;

pub use replay::ReplayDetector;
pub use stub::StubDetector;

/// External object detector.
///
/// Implementations own model acquisition and inference. The pipeline only
/// relies on the output shape: normalized boxes, integer classes and
/// confidences, already pruned against `confidence_threshold`.
pub trait Detector {
    /// Backend identifier, used in logs.
    fn name(&self) -> &str;

    /// Run detection on one image. Results may still contain malformed
    /// boxes; the pipeline validates each one.
    fn detect(
        &mut self,
        image: &DynamicImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>>;
}

/// Lets a caller keep ownership of a detector across pipeline runs.
impl<D: Detector + ?Sized> Detector for &mut D {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(
        &mut self,
        image: &DynamicImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>> {
        (**self).detect(image, confidence_threshold)
    }
}

/// Source of the image a pipeline run works on.
pub trait ImageLoader {
    fn load(&self) -> Result<DynamicImage>;
}

/// Decodes an image file from disk, guessing the format from its content.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    path: PathBuf,
}

impl FileImageLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self) -> Result<DynamicImage> {
        let img = ImageReader::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        Ok(img)
    }
}

/// An image already in memory.
impl ImageLoader for DynamicImage {
    fn load(&self) -> Result<DynamicImage> {
        Ok(self.clone())
    }
}
