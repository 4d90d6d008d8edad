use anyhow::Result;
use image::DynamicImage;

use crate::detector::Detector;
use crate::models::RawDetection;

/// Detector returning a fixed list of results, for tests and dry runs.
///
/// Applies the confidence threshold like a real backend would, but passes
/// malformed entries through untouched.
#[derive(Debug, Clone, Default)]
pub struct StubDetector {
    results: Vec<RawDetection>,
    calls: usize,
}

impl StubDetector {
    pub fn new(results: Vec<RawDetection>) -> Self {
        Self { results, calls: 0 }
    }

    /// Number of times `detect` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &str {
        "stub"
    }

    fn detect(
        &mut self,
        _image: &DynamicImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        Ok(self
            .results
            .iter()
            .filter(|raw| raw.confidence > confidence_threshold)
            .cloned()
            .collect())
    }
}
