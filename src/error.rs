use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::PipelineState;

/// A detection that violates the record invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidDetectionError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("coordinate {name}={value} is outside [0, 1]")]
    CoordinateOutOfRange { name: &'static str, value: f64 },
    #[error("degenerate box: x1={x1} must be < x2={x2} and y1={y1} must be < y2={y2}")]
    DegenerateBox { x1: f64, y1: f64, x2: f64, y2: f64 },
    #[error("class id {0} is not a valid non-negative class")]
    InvalidClass(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid image dimensions {width}x{height}")]
pub struct InvalidDimensionsError {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error(transparent)]
    InvalidDimensions(#[from] InvalidDimensionsError),
    #[error(transparent)]
    InvalidDetection(#[from] InvalidDetectionError),
}

/// Failure while drawing or writing an overlay. A render that returns this
/// produced no usable artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load image {}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode overlay")]
    Encode(#[source] image::ImageError),
    #[error("unsupported output format for {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    InvalidDimensions(#[from] InvalidDimensionsError),
}

/// Fatal pipeline failure. Each variant corresponds to one state transition.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),
    #[error("failed to load model")]
    DetectorInit(#[source] anyhow::Error),
    #[error("failed to load image")]
    ImageLoad(#[source] anyhow::Error),
    #[error("inference failed")]
    Inference(#[source] anyhow::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// The state the run was in when it failed.
    pub fn stage(&self) -> PipelineState {
        match self {
            PipelineError::InvalidThreshold(_) | PipelineError::DetectorInit(_) => {
                PipelineState::Start
            }
            PipelineError::ImageLoad(_) => PipelineState::ModelReady,
            PipelineError::Inference(_) => PipelineState::ImageLoaded,
            PipelineError::Render(_) => PipelineState::Detected,
        }
    }
}
