pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod severity;

pub use config::Config;
pub use detector::{Detector, FileImageLoader, ImageLoader, ReplayDetector, StubDetector};
pub use error::{
    GeometryError, InvalidDetectionError, InvalidDimensionsError, PipelineError, RenderError,
};
pub use geometry::{PixelBox, denormalize, normalize};
pub use models::{BoundingBox, Detection, RawDetection};
pub use overlay::{LabelFont, OverlayRenderer, OverlayStyle};
pub use pipeline::{Pipeline, PipelineOutput, PipelineState, build_detections};
pub use report::Report;
pub use severity::{SeverityClassifier, SeverityPalette, SeverityThresholds, SeverityTier};
