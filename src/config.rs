//! Run configuration for the detection pipeline.

use crate::util::{DetectError, DetectResult};
use std::time::Duration;

/// Network input resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputSize {
    pub width: usize,
    pub height: usize,
}

impl InputSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Scope of overlap suppression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SuppressionMode {
    /// A box only suppresses overlapping boxes of its own class.
    #[default]
    ClassAware,
    /// A box suppresses every overlapping box regardless of class.
    ClassAgnostic,
}

/// Layout and scoring rule of the raw network output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OutputConvention {
    /// Rows of `[cx, cy, w, h, objectness, scores...]` normalized to `0..1`.
    /// Confidence is the maximum class score.
    #[default]
    Darknet,
    /// Rows of `[cx, cy, w, h, objectness, scores...]` in network input
    /// pixels. Confidence is objectness times the maximum class score.
    Hub,
    /// A transposed `[4 + classes, cells]` tensor in network input pixels.
    /// Confidence is the maximum class score.
    Anchorless,
}

impl OutputConvention {
    /// Number of leading non-class values per cell.
    pub(crate) fn box_params(self) -> usize {
        match self {
            OutputConvention::Darknet | OutputConvention::Hub => 5,
            OutputConvention::Anchorless => 4,
        }
    }
}

/// Parameters fixed for the duration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectConfig {
    /// Candidates must score strictly above this value.
    pub confidence_threshold: f32,
    /// Pairs with IoU above this value are suppressed.
    pub nms_iou_threshold: f32,
    /// Resolution the network was exported for.
    pub input_size: InputSize,
    /// Suppression scope.
    pub suppression: SuppressionMode,
    /// Raw output layout produced by the detector.
    pub convention: OutputConvention,
    /// Per-image inference deadline; `None` disables the check.
    pub inference_timeout: Option<Duration>,
    /// Run batches on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            nms_iou_threshold: 0.4,
            input_size: InputSize::new(416, 416),
            suppression: SuppressionMode::ClassAware,
            convention: OutputConvention::Darknet,
            inference_timeout: None,
            parallel: false,
        }
    }
}

impl DetectConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> DetectResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DetectError::InvalidConfig(
                "confidence_threshold must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.nms_iou_threshold) {
            return Err(DetectError::InvalidConfig(
                "nms_iou_threshold must be within [0, 1]",
            ));
        }
        if self.input_size.width == 0 || self.input_size.height == 0 {
            return Err(DetectError::InvalidConfig("input_size must be non-zero"));
        }
        if self.inference_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DetectError::InvalidConfig(
                "inference_timeout must be positive",
            ));
        }
        Ok(())
    }
}
