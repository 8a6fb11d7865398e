//! Candidate extraction: decode raw cells, score them and apply the
//! confidence threshold.

use crate::candidate::raw::{layer_predictions, RawOutput, RawPrediction};
use crate::candidate::Candidate;
use crate::config::{DetectConfig, OutputConvention};
use crate::detection::check_ranges;
use crate::geometry::BBox;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{DetectError, DetectResult};

/// Candidates that passed the threshold plus bookkeeping for the report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    /// Candidates in raw cell order.
    pub candidates: Vec<Candidate>,
    /// Cells dropped because a decoded value violated its declared range.
    pub dropped: usize,
    /// Total number of cells inspected.
    pub cells: usize,
}

/// Decodes raw predictions into pixel-space candidates.
///
/// Coordinates are scaled to the original `image_width` x `image_height`,
/// never to the network input size. Only candidates with
/// `confidence > confidence_threshold` are kept; each cell contributes at most
/// one candidate, assigned to its highest-scoring class. Cells whose decoded
/// confidence or box is out of range are dropped and counted rather than
/// failing the call.
///
/// Returns [`DetectError::MalformedOutput`] for tensors of the wrong shape and
/// [`DetectError::ClassCountMismatch`] when the number of class scores differs
/// from `num_classes`.
pub fn extract_candidates(
    output: &RawOutput,
    image_width: usize,
    image_height: usize,
    num_classes: usize,
    cfg: &DetectConfig,
) -> DetectResult<Extraction> {
    let _span = trace_span!("extract", layers = output.layers.len()).entered();

    let (sx, sy) = coordinate_scale(image_width, image_height, cfg);
    let mut out = Extraction::default();

    for (layer, tensor) in output.layers.iter().enumerate() {
        let predictions = layer_predictions(tensor, layer, out.cells, cfg.convention)?;
        if let Some(first) = predictions.first() {
            if first.scores.len() != num_classes {
                return Err(DetectError::ClassCountMismatch {
                    expected: num_classes,
                    got: first.scores.len(),
                });
            }
        }
        out.cells += predictions.len();

        for pred in &predictions {
            match decode(pred, sx, sy, cfg) {
                Decoded::Kept(candidate) => out.candidates.push(candidate),
                Decoded::BelowThreshold => {}
                Decoded::Invalid(reason) => {
                    trace_warn!("candidate_dropped", cell = pred.cell, reason = reason);
                    out.dropped += 1;
                }
            }
        }
    }

    trace_event!(
        "candidates",
        cells = out.cells,
        kept = out.candidates.len(),
        dropped = out.dropped
    );
    Ok(out)
}

enum Decoded {
    Kept(Candidate),
    BelowThreshold,
    Invalid(&'static str),
}

fn decode(pred: &RawPrediction<'_>, sx: f32, sy: f32, cfg: &DetectConfig) -> Decoded {
    let Some((class_id, best)) = pred.scores.argmax() else {
        return Decoded::BelowThreshold;
    };
    if !is_probability(best) {
        return Decoded::Invalid("class score outside [0, 1]");
    }
    let confidence = match (cfg.convention, pred.objectness) {
        (OutputConvention::Hub, Some(objectness)) => {
            if !is_probability(objectness) {
                return Decoded::Invalid("objectness outside [0, 1]");
            }
            objectness * best
        }
        _ => best,
    };
    if confidence <= cfg.confidence_threshold {
        return Decoded::BelowThreshold;
    }

    let [cx, cy, w, h] = pred.box_params;
    let bbox = BBox::from_center(cx * sx, cy * sy, w * sx, h * sy);
    if let Err(reason) = check_ranges(&bbox, confidence) {
        return Decoded::Invalid(reason);
    }
    Decoded::Kept(Candidate {
        bbox,
        class_id,
        confidence,
        cell: pred.cell,
    })
}

fn is_probability(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Factors mapping raw coordinates to original-image pixels.
fn coordinate_scale(image_width: usize, image_height: usize, cfg: &DetectConfig) -> (f32, f32) {
    let (w, h) = (image_width as f32, image_height as f32);
    match cfg.convention {
        OutputConvention::Darknet => (w, h),
        OutputConvention::Hub | OutputConvention::Anchorless => (
            w / cfg.input_size.width as f32,
            h / cfg.input_size.height as f32,
        ),
    }
}
