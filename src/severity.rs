use std::fmt;

use anyhow::{Result, bail};
use image::Rgb;
use serde::Serialize;

use crate::models::Detection;

/// Confidence bucket driving the overlay color. Ordered `Mild < Moderate < Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Mild,
    Moderate,
    Severe,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Mild => "mild",
            SeverityTier::Moderate => "moderate",
            SeverityTier::Severe => "severe",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (exclusive) of the upper two tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub severe_above: f64,
    pub moderate_above: f64,
}

impl SeverityThresholds {
    /// Both bounds must lie in `[0, 1]` with `moderate_above < severe_above`.
    pub fn validate(&self) -> Result<()> {
        let Self {
            severe_above,
            moderate_above,
        } = *self;
        if !(0.0..=1.0).contains(&severe_above) || !(0.0..=1.0).contains(&moderate_above) {
            bail!("severity thresholds must lie in [0, 1] (got {moderate_above}, {severe_above})");
        }
        if moderate_above >= severe_above {
            bail!(
                "moderate threshold {moderate_above} must be below severe threshold {severe_above}"
            );
        }
        Ok(())
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            severe_above: 0.8,
            moderate_above: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityPalette {
    pub severe: Rgb<u8>,
    pub moderate: Rgb<u8>,
    pub mild: Rgb<u8>,
}

impl Default for SeverityPalette {
    fn default() -> Self {
        Self {
            severe: Rgb([255, 0, 0]),
            moderate: Rgb([255, 165, 0]),
            mild: Rgb([255, 255, 0]),
        }
    }
}

/// Maps confidence scores to tiers and tiers to display colors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeverityClassifier {
    thresholds: SeverityThresholds,
    palette: SeverityPalette,
}

impl SeverityClassifier {
    /// Classifier with explicit tier bounds and colors. Use
    /// [`SeverityThresholds::validate`] first when the bounds come from
    /// user input.
    pub fn new(thresholds: SeverityThresholds, palette: SeverityPalette) -> Self {
        Self {
            thresholds,
            palette,
        }
    }

    /// Upper bounds are inclusive: a confidence exactly at a threshold
    /// belongs to the lower tier.
    pub fn classify(&self, confidence: f64) -> SeverityTier {
        if confidence > self.thresholds.severe_above {
            SeverityTier::Severe
        } else if confidence > self.thresholds.moderate_above {
            SeverityTier::Moderate
        } else {
            SeverityTier::Mild
        }
    }

    /// Display color of `tier`.
    pub fn color(&self, tier: SeverityTier) -> Rgb<u8> {
        match tier {
            SeverityTier::Severe => self.palette.severe,
            SeverityTier::Moderate => self.palette.moderate,
            SeverityTier::Mild => self.palette.mild,
        }
    }

    /// Most severe tier in a result set, `None` when it is empty.
    pub fn highest(&self, detections: &[Detection]) -> Option<SeverityTier> {
        detections
            .iter()
            .map(|d| self.classify(d.confidence()))
            .max()
    }
}
