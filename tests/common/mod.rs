#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from plantscan for tests
pub use plantscan::{
    Detection, Detector, ImageLoader, OverlayRenderer, OverlayStyle, Pipeline, PipelineError,
    PipelineState, RawDetection, RenderError, SeverityClassifier, StubDetector,
};
