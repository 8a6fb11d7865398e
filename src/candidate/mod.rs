//! Candidate extraction and pruning.
//!
//! Raw network output is decoded into [`Candidate`]s by
//! [`extract::extract_candidates`] and pruned by [`nms::nms`].

pub mod extract;
pub mod nms;
pub mod raw;

use crate::config::DetectConfig;
use crate::detection::Detection;
use crate::geometry::BBox;
use crate::util::DetectResult;

/// A thresholded but not yet suppressed detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Box in original-image pixels.
    pub bbox: BBox,
    /// Highest-scoring class.
    pub class_id: usize,
    /// Score used for thresholding and ranking.
    pub confidence: f32,
    /// Raw cell the candidate was decoded from.
    pub cell: usize,
}

impl Candidate {
    pub fn to_detection(&self) -> DetectResult<Detection> {
        Detection::new(self.bbox, self.class_id, self.confidence)
    }
}

/// Runs suppression with the configured threshold and scope and returns the
/// kept detections in descending confidence order.
pub fn suppress(candidates: &[Candidate], cfg: &DetectConfig) -> DetectResult<Vec<Detection>> {
    nms::nms(candidates, cfg.nms_iou_threshold, cfg.suppression)
        .into_iter()
        .map(|idx| candidates[idx].to_detection())
        .collect()
}
