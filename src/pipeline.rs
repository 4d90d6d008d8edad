use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};

use crate::detector::{Detector, ImageLoader};
use crate::error::{PipelineError, RenderError};
use crate::models::{Detection, RawDetection};
use crate::overlay::OverlayRenderer;

/// Default confidence threshold handed to the detector.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;

/// Steps of a single pipeline run. Runs only move forward; `Failed` can be
/// reached from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    ModelReady,
    ImageLoaded,
    Detected,
    Rendered,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub detections: Vec<Detection>,
    /// Raw results rejected during record construction.
    pub dropped: usize,
    /// Where the overlay was written, when visualization was requested.
    pub rendered: Option<PathBuf>,
    /// States visited, in order, ending with `Done`.
    pub states: Vec<PipelineState>,
}

/// Settings shared by every step of a run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub confidence_threshold: f64,
    pub visualize: Option<PathBuf>,
    pub renderer: OverlayRenderer,
}

/// Single-image detection pipeline: detector, record construction and an
/// optional overlay render. Holds only configuration, so one instance can
/// serve any number of runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    context: PipelineContext,
}

impl Pipeline {
    /// Pipeline with the default confidence threshold and no visualization.
    pub fn new(renderer: OverlayRenderer) -> Self {
        Self {
            context: PipelineContext {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                visualize: None,
                renderer,
            },
        }
    }

    /// Threshold the detector uses to prune its raw output. Must lie in `[0, 1]`.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::InvalidThreshold(threshold));
        }
        self.context.confidence_threshold = threshold;
        Ok(self)
    }

    /// Render an overlay to `output` after detection.
    /// The output extension must name a known image format.
    pub fn with_visualization(mut self, output: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let output = output.into();
        if ImageFormat::from_path(&output).is_err() {
            return Err(RenderError::UnsupportedFormat(output).into());
        }
        self.context.visualize = Some(output);
        Ok(self)
    }

    /// Get the settings every run uses
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Run once: initialize the detector, load the image, detect, and render
    /// if requested. The first failure ends the run; nothing is retried.
    pub fn run<D, F>(
        &self,
        init_detector: F,
        loader: &dyn ImageLoader,
    ) -> Result<PipelineOutput, PipelineError>
    where
        D: Detector,
        F: FnOnce() -> anyhow::Result<D>,
    {
        let mut run = Run::default();
        let result = self.execute(&mut run, init_detector, loader);

        match result {
            Ok((detections, dropped, rendered)) => {
                run.advance(PipelineState::Done);
                Ok(PipelineOutput {
                    detections,
                    dropped,
                    rendered,
                    states: run.states,
                })
            }
            Err(e) => {
                warn!("pipeline failed after {}: {}", run.current(), e);
                run.advance(PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn execute<D, F>(
        &self,
        run: &mut Run,
        init_detector: F,
        loader: &dyn ImageLoader,
    ) -> Result<(Vec<Detection>, usize, Option<PathBuf>), PipelineError>
    where
        D: Detector,
        F: FnOnce() -> anyhow::Result<D>,
    {
        let mut detector = init_detector().map_err(PipelineError::DetectorInit)?;
        run.advance(PipelineState::ModelReady);
        debug!("detector '{}' ready", detector.name());

        let image = loader.load().map_err(PipelineError::ImageLoad)?;
        run.advance(PipelineState::ImageLoaded);
        debug!("image loaded: {}x{}", image.width(), image.height());

        let raw = detector
            .detect(&image, self.context.confidence_threshold)
            .map_err(PipelineError::Inference)?;
        let raw_count = raw.len();
        let detections = build_detections(raw);
        let dropped = raw_count - detections.len();
        run.advance(PipelineState::Detected);
        info!(
            "{} detections ({} dropped) at threshold {:.2}",
            detections.len(),
            dropped,
            self.context.confidence_threshold
        );

        let rendered = match &self.context.visualize {
            Some(output) => {
                self.render(&image, &detections, output)?;
                run.advance(PipelineState::Rendered);
                Some(output.clone())
            }
            None => None,
        };

        Ok((detections, dropped, rendered))
    }

    fn render(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
        output: &Path,
    ) -> Result<(), PipelineError> {
        let canvas = self.context.renderer.render(image, detections)?;
        self.context.renderer.save(&canvas, output)?;
        Ok(())
    }
}

/// Convert raw detector output into records, dropping invalid entries one
/// by one instead of failing the batch.
pub fn build_detections(raw: impl IntoIterator<Item = RawDetection>) -> Vec<Detection> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| match Detection::try_from(raw) {
            Ok(detection) => Some(detection),
            Err(e) => {
                warn!("dropping raw detection #{}: {}", idx, e);
                None
            }
        })
        .collect()
}

/// State bookkeeping for one run.
struct Run {
    states: Vec<PipelineState>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            states: vec![PipelineState::Start],
        }
    }
}

impl Run {
    fn current(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Start)
    }

    fn advance(&mut self, next: PipelineState) {
        debug!("pipeline: {} -> {}", self.current(), next);
        self.states.push(next);
    }
}
