use serde::{Deserialize, Serialize};

use crate::error::InvalidDetectionError;

/// Label rendered for detections that carry no display name.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Bounding box in normalized image-fraction coordinates.
///
/// Always satisfies `0 <= x1 < x2 <= 1` and `0 <= y1 < y2 <= 1`; the only
/// way to obtain one is through [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BoundingBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl BoundingBox {
    /// Validate and build a box. NaN or out-of-range coordinates and boxes
    /// with no area are rejected.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, InvalidDetectionError> {
        for (name, value) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
            // NaN fails the range check as well
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidDetectionError::CoordinateOutOfRange { name, value });
            }
        }

        if x1 >= x2 || y1 >= y2 {
            return Err(InvalidDetectionError::DegenerateBox { x1, y1, x2, y2 });
        }

        Ok(Self { x1, y1, x2, y2 })
    }

    /// Left edge as a fraction of image width.
    pub fn x1(&self) -> f64 {
        self.x1
    }

    /// Top edge as a fraction of image height.
    pub fn y1(&self) -> f64 {
        self.y1
    }

    /// Right edge as a fraction of image width.
    pub fn x2(&self) -> f64 {
        self.x2
    }

    /// Bottom edge as a fraction of image height.
    pub fn y2(&self) -> f64 {
        self.y2
    }

    /// Corners as `[x1, y1, x2, y2]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = InvalidDetectionError;

    fn try_from([x1, y1, x2, y2]: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

/// One validated detected object instance. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    bbox: BoundingBox,
    #[serde(rename = "class")]
    class_id: u32,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Detection {
    /// Build a record from a normalized `[x1, y1, x2, y2]` box, a class id
    /// and a confidence in `[0, 1]`.
    pub fn new(
        bbox: [f64; 4],
        class_id: u32,
        confidence: f64,
    ) -> Result<Self, InvalidDetectionError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(InvalidDetectionError::ConfidenceOutOfRange(confidence));
        }

        Ok(Self {
            bbox: BoundingBox::try_from(bbox)?,
            class_id,
            confidence,
            label: None,
        })
    }

    /// Attach a display name used only when rendering.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the normalized bounding box
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Get the detector class id
    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    /// Get the detector confidence
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Label to show on the overlay, `"Unknown"` when none was attached.
    pub fn display_label(&self) -> &str {
        self.label().unwrap_or(UNKNOWN_LABEL)
    }

    /// Text drawn next to the box, e.g. `"leaf_rust (0.87)"`.
    pub fn caption(&self) -> String {
        format!("{} ({:.2})", self.display_label(), self.confidence)
    }
}

/// Unvalidated detector output, and the JSON shape accepted by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: [f64; 4],
    #[serde(rename = "class", default)]
    pub class_id: i64,
    pub confidence: f64,
    #[serde(default, alias = "disease", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RawDetection {
    /// Raw result without a display label.
    pub fn new(bbox: [f64; 4], class_id: i64, confidence: f64) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
            label: None,
        }
    }
}

impl TryFrom<RawDetection> for Detection {
    type Error = InvalidDetectionError;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let class_id = u32::try_from(raw.class_id)
            .map_err(|_| InvalidDetectionError::InvalidClass(raw.class_id))?;
        let detection = Detection::new(raw.bbox, class_id, raw.confidence)?;

        Ok(match raw.label {
            Some(label) => detection.with_label(label),
            None => detection,
        })
    }
}
