//! Detector backends.
//!
//! A [`Detector`] turns a decoded image into raw output tensors. Backends are
//! interchangeable: the engine only depends on the trait, and every backend
//! is constructed from the same [`ModelFiles`] and [`DetectConfig`].

use crate::candidate::raw::RawOutput;
use crate::config::DetectConfig;
use crate::image::ImageView;
use crate::util::{DetectError, DetectResult};
use std::path::{Path, PathBuf};

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "replay")]
pub mod replay;

/// Paths to the files a detector needs at start-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelFiles {
    /// Network weights (or recording directory for replay).
    pub weights: PathBuf,
    /// Optional network definition, for formats that split it from weights.
    pub config: Option<PathBuf>,
    /// Newline-delimited class names.
    pub labels: PathBuf,
}

impl ModelFiles {
    pub fn new(weights: impl Into<PathBuf>, labels: impl Into<PathBuf>) -> Self {
        Self {
            weights: weights.into(),
            config: None,
            labels: labels.into(),
        }
    }

    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Checks that every referenced path exists.
    pub fn verify(&self) -> DetectResult<()> {
        require_exists("weights", &self.weights)?;
        if let Some(config) = &self.config {
            require_exists("config", config)?;
        }
        require_exists("label", &self.labels)
    }
}

fn require_exists(what: &'static str, path: &Path) -> DetectResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DetectError::MissingFile {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Capability shared by every detector backend.
///
/// `infer` takes `&self`: engines share one detector across batch workers, so
/// backends with mutable sessions must serialize calls internally.
pub trait Detector: Send + Sync {
    /// Constructs the backend. Failures here are fatal configuration errors.
    fn load(files: &ModelFiles, cfg: &DetectConfig) -> DetectResult<Self>
    where
        Self: Sized;

    /// Runs the network on one image and returns its raw output layers.
    ///
    /// `name` identifies the image for logging and for backends that key
    /// results by source.
    fn infer(&self, name: &str, image: ImageView<'_, u8>) -> DetectResult<RawOutput>;
}
