//! detpost is a post-processing engine for single-shot object detectors.
//!
//! Raw network output is decoded into pixel-space candidates, filtered by
//! confidence and pruned with greedy IoU non-maximum suppression. Detector
//! backends sit behind the [`Detector`] trait; batches can run on the rayon
//! pool with the `rayon` feature, and the `image-io` feature adds decoding and
//! box drawing.

pub mod candidate;
pub mod config;
pub mod detection;
pub mod engine;
pub mod geometry;
pub mod image;
pub mod labels;
pub mod model;
pub mod report;
mod trace;
pub mod util;

pub use candidate::extract::{extract_candidates, Extraction};
pub use candidate::nms::nms;
pub use candidate::raw::{RawOutput, RawTensor};
pub use candidate::{suppress, Candidate};
pub use config::{DetectConfig, InputSize, OutputConvention, SuppressionMode};
pub use detection::Detection;
pub use engine::{BatchReport, Engine, ImageReport, ImageResult, ImageSource, NamedImage};
pub use geometry::BBox;
pub use crate::image::{ImageView, OwnedImage};
pub use labels::LabelTable;
pub use model::{Detector, ModelFiles};
pub use util::{DetectError, DetectResult, ErrorKind};

#[cfg(feature = "image-io")]
pub use crate::image::io;
#[cfg(feature = "onnx")]
pub use model::onnx::OnnxDetector;
#[cfg(feature = "replay")]
pub use model::replay::ReplayDetector;
