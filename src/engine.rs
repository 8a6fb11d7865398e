//! Per-image pipeline and batch runner.
//!
//! An [`Engine`] owns one detector handle and a shared label table. Each image
//! runs inference, candidate extraction and suppression in sequence; batches
//! run images independently and collect every per-image failure instead of
//! stopping.

use crate::candidate::extract::extract_candidates;
use crate::candidate::suppress;
use crate::config::DetectConfig;
use crate::detection::Detection;
use crate::image::{ImageView, OwnedImage};
use crate::labels::LabelTable;
use crate::model::{Detector, ModelFiles};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{DetectError, DetectResult};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Detections and bookkeeping for one image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageResult {
    /// Kept detections in descending confidence order.
    pub detections: Vec<Detection>,
    /// Candidates that passed the confidence threshold before suppression.
    pub candidates: usize,
    /// Cells dropped for out-of-range values.
    pub dropped: usize,
}

/// Outcome of one batch item.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageReport {
    pub name: String,
    pub outcome: DetectResult<ImageResult>,
}

/// Outcomes of a batch, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub items: Vec<ImageReport>,
}

impl BatchReport {
    /// Items that completed, with their results.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &ImageResult)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            Ok(result) => Some((item.name.as_str(), result)),
            Err(_) => None,
        })
    }

    /// Items that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DetectError)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            Ok(_) => None,
            Err(err) => Some((item.name.as_str(), err)),
        })
    }

    /// Total cells dropped across successful items.
    pub fn dropped_total(&self) -> usize {
        self.successes().map(|(_, result)| result.dropped).sum()
    }
}

/// A named image that a batch can load on demand.
pub trait ImageSource: Sync {
    /// Name used in logs and reports.
    fn name(&self) -> Cow<'_, str>;

    /// Decodes or borrows the pixels.
    fn load(&self) -> DetectResult<Cow<'_, OwnedImage>>;
}

/// In-memory image paired with its name.
#[derive(Clone, Debug)]
pub struct NamedImage {
    pub name: String,
    pub image: OwnedImage,
}

impl ImageSource for NamedImage {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn load(&self) -> DetectResult<Cow<'_, OwnedImage>> {
        Ok(Cow::Borrowed(&self.image))
    }
}

#[cfg(feature = "image-io")]
impl ImageSource for std::path::PathBuf {
    fn name(&self) -> Cow<'_, str> {
        match self.file_name() {
            Some(name) => name.to_string_lossy(),
            None => self.to_string_lossy(),
        }
    }

    fn load(&self) -> DetectResult<Cow<'_, OwnedImage>> {
        crate::image::io::load_rgb_image(self).map(Cow::Owned)
    }
}

/// Detection pipeline bound to one detector and label table.
pub struct Engine<D> {
    detector: D,
    labels: Arc<LabelTable>,
    cfg: DetectConfig,
}

impl<D: Detector> Engine<D> {
    /// Wraps an already constructed detector.
    pub fn new(detector: D, labels: Arc<LabelTable>, cfg: DetectConfig) -> DetectResult<Self> {
        cfg.validate()?;
        Ok(Self {
            detector,
            labels,
            cfg,
        })
    }

    /// Verifies the model files, loads the labels and constructs the detector.
    ///
    /// Every error returned here is a configuration error.
    pub fn load(files: &ModelFiles, cfg: DetectConfig) -> DetectResult<Self> {
        cfg.validate()?;
        files.verify()?;
        let labels = Arc::new(LabelTable::from_file(&files.labels)?);
        let detector = D::load(files, &cfg)?;
        trace_event!("engine_ready", classes = labels.len());
        Ok(Self {
            detector,
            labels,
            cfg,
        })
    }

    /// Returns the shared label table.
    pub fn labels(&self) -> &Arc<LabelTable> {
        &self.labels
    }

    /// Runs the full pipeline on one image.
    pub fn detect(&self, name: &str, image: ImageView<'_, u8>) -> DetectResult<ImageResult> {
        let _span = trace_span!("detect", image = name).entered();

        let started = Instant::now();
        let output = self.detector.infer(name, image)?;
        if let Some(limit) = self.cfg.inference_timeout {
            let elapsed = started.elapsed();
            if elapsed > limit {
                trace_warn!(
                    "inference_timeout",
                    limit_ms = limit.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64
                );
                return Err(DetectError::InferenceTimeout {
                    limit_ms: limit.as_millis(),
                    elapsed_ms: elapsed.as_millis(),
                });
            }
        }

        let extraction = extract_candidates(
            &output,
            image.width(),
            image.height(),
            self.labels.len(),
            &self.cfg,
        )?;
        let detections = suppress(&extraction.candidates, &self.cfg)?;
        trace_event!(
            "detections",
            candidates = extraction.candidates.len(),
            kept = detections.len()
        );
        Ok(ImageResult {
            detections,
            candidates: extraction.candidates.len(),
            dropped: extraction.dropped,
        })
    }

    fn run_item<S: ImageSource>(&self, source: &S) -> ImageReport {
        let name = source.name().into_owned();
        let outcome = source
            .load()
            .and_then(|image| self.detect(&name, image.view()));
        if let Err(err) = &outcome {
            trace_warn!("image_failed", image = name.as_str(), error = err.to_string().as_str());
        }
        ImageReport { name, outcome }
    }

    /// Runs every input independently and reports outcomes in input order.
    ///
    /// With the `rayon` feature and `parallel` set, images are processed on
    /// the rayon pool; the report order is unaffected.
    pub fn run_batch<S: ImageSource>(&self, inputs: &[S]) -> BatchReport {
        let _span = trace_span!("batch", images = inputs.len()).entered();

        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            let items = inputs.par_iter().map(|src| self.run_item(src)).collect();
            return BatchReport { items };
        }

        let items = inputs.iter().map(|src| self.run_item(src)).collect();
        BatchReport { items }
    }

    /// Tears the engine down and hands back the detector.
    pub fn shutdown(self) -> D {
        trace_event!("engine_shutdown");
        self.detector
    }
}
