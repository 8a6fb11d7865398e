//! Error types for detpost.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for detpost operations.
pub type DetectResult<T> = std::result::Result<T, DetectError>;

/// Coarse classification of a [`DetectError`].
///
/// Configuration failures halt engine construction. Every other kind is scoped
/// to a single image and is collected into the batch report instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing model or label files, invalid parameters.
    Configuration,
    /// The input image could not be read or has unusable dimensions.
    Input,
    /// The detector failed or produced output of the wrong shape.
    Inference,
    /// A decoded candidate violated a range invariant.
    Validation,
}

impl ErrorKind {
    /// Returns true when the error must stop the run.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Configuration)
    }
}

/// Errors that can occur while building or running the detection pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetectError {
    /// A required model, config or label file does not exist.
    #[error("{what} file not found: {}", path.display())]
    MissingFile { what: &'static str, path: PathBuf },
    /// The label file exists but could not be read.
    #[error("failed to read label file {}: {reason}", path.display())]
    LabelFile { path: PathBuf, reason: String },
    /// The label source contained no class names.
    #[error("label table is empty")]
    EmptyLabelTable,
    /// A configuration parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The detector backend could not be constructed.
    #[error("failed to load model: {reason}")]
    ModelLoad { reason: String },
    /// The image has a channel layout the backend cannot consume.
    #[error("unsupported channel count {channels}, expected {expected}")]
    UnsupportedChannels { channels: usize, expected: usize },
    /// The input image is missing or could not be decoded.
    #[error("image unreadable: {name}: {reason}")]
    ImageUnreadable { name: String, reason: String },
    /// The image dimensions are invalid.
    #[error("invalid dimensions: {width}x{height}x{channels}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },
    /// The stride is shorter than one row of pixels.
    #[error("invalid stride {stride} for row length {row_len}")]
    InvalidStride { row_len: usize, stride: usize },
    /// The provided pixel buffer is too small.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A raw output tensor has the wrong dimensionality or length.
    #[error("malformed raw output (layer {layer}): {reason}")]
    MalformedOutput { layer: usize, reason: String },
    /// The number of class scores does not match the label table.
    #[error("raw output has {got} class scores, label table has {expected}")]
    ClassCountMismatch { expected: usize, got: usize },
    /// Inference took longer than the configured deadline.
    #[error("inference exceeded deadline of {limit_ms} ms (took {elapsed_ms} ms)")]
    InferenceTimeout { limit_ms: u128, elapsed_ms: u128 },
    /// The detector backend reported a runtime failure.
    #[error("detector backend failed: {0}")]
    Backend(String),
    /// A decoded candidate is outside the declared invariant range.
    #[error("invalid candidate: {0}")]
    InvalidCandidate(&'static str),
}

impl DetectError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectError::MissingFile { .. }
            | DetectError::LabelFile { .. }
            | DetectError::EmptyLabelTable
            | DetectError::InvalidConfig(_)
            | DetectError::ModelLoad { .. } => ErrorKind::Configuration,
            DetectError::ImageUnreadable { .. }
            | DetectError::UnsupportedChannels { .. }
            | DetectError::InvalidDimensions { .. }
            | DetectError::InvalidStride { .. }
            | DetectError::BufferTooSmall { .. } => ErrorKind::Input,
            DetectError::MalformedOutput { .. }
            | DetectError::ClassCountMismatch { .. }
            | DetectError::InferenceTimeout { .. }
            | DetectError::Backend(_) => ErrorKind::Inference,
            DetectError::InvalidCandidate(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn malformed(layer: usize, reason: impl Into<String>) -> Self {
        DetectError::MalformedOutput {
            layer,
            reason: reason.into(),
        }
    }
}
