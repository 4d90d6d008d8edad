use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use log::debug;

use crate::detector::Detector;
use crate::models::RawDetection;

/// Replays raw detector output recorded to a JSON file.
///
/// The file holds an array of `{"bbox": [x1, y1, x2, y2], "class": n,
/// "confidence": c}` objects, the same shape a live model produces. Loading
/// the file stands in for loading model weights.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    results: Vec<RawDetection>,
}

impl ReplayDetector {
    /// Read a recording from `path`. Fails when the file is missing or is
    /// not a JSON array of raw detections.
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let results = Self::parse(&text)
            .with_context(|| format!("failed to parse detections in {}", path.display()))?;
        debug!("loaded {} recorded detections from {}", results.len(), path.display());
        Ok(Self { results })
    }

    /// Parse recorded results without touching the filesystem.
    pub fn parse(json: &str) -> Result<Vec<RawDetection>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_results(results: Vec<RawDetection>) -> Self {
        Self { results }
    }
}

impl Detector for ReplayDetector {
    fn name(&self) -> &str {
        "replay"
    }

    /// Keeps results strictly above the threshold, in recorded order.
    fn detect(
        &mut self,
        image: &DynamicImage,
        confidence_threshold: f64,
    ) -> Result<Vec<RawDetection>> {
        let kept: Vec<RawDetection> = self
            .results
            .iter()
            .filter(|raw| raw.confidence > confidence_threshold)
            .cloned()
            .collect();
        debug!(
            "replay: {} of {} results above {:.2} for {}x{} image",
            kept.len(),
            self.results.len(),
            confidence_threshold,
            image.width(),
            image.height()
        );
        Ok(kept)
    }
}
