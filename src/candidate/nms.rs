//! Greedy IoU non-maximum suppression.

use crate::candidate::Candidate;
use crate::config::SuppressionMode;
use crate::trace::{trace_event, trace_span};
use std::cmp::Ordering;

fn candidate_cmp_desc(candidates: &[Candidate], a: usize, b: usize) -> Ordering {
    candidates[b]
        .confidence
        .total_cmp(&candidates[a].confidence)
        .then_with(|| a.cmp(&b))
}

/// Returns candidate indices sorted by descending confidence.
///
/// Equal confidences keep their input order so results are reproducible.
pub fn sort_by_confidence_desc(candidates: &[Candidate]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| candidate_cmp_desc(candidates, a, b));
    order
}

/// Applies greedy non-maximum suppression.
///
/// Candidates are visited by descending confidence. A candidate is kept unless
/// a previously kept box overlaps it with IoU strictly above `iou_threshold`;
/// in [`SuppressionMode::ClassAware`] only kept boxes of the same class count.
/// Returns the kept indices in the order they were kept.
pub fn nms(candidates: &[Candidate], iou_threshold: f32, mode: SuppressionMode) -> Vec<usize> {
    let _span = trace_span!("nms", candidates = candidates.len()).entered();

    let order = sort_by_confidence_desc(candidates);
    let mut kept: Vec<usize> = Vec::new();

    'outer: for idx in order {
        let cand = &candidates[idx];
        for &kept_idx in kept.iter() {
            let other = &candidates[kept_idx];
            if mode == SuppressionMode::ClassAware && other.class_id != cand.class_id {
                continue;
            }
            if cand.bbox.iou(&other.bbox) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(idx);
    }

    trace_event!("nms_kept", kept = kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::{nms, sort_by_confidence_desc};
    use crate::candidate::Candidate;
    use crate::config::SuppressionMode;
    use crate::geometry::BBox;

    fn cand(x: f32, class_id: usize, confidence: f32) -> Candidate {
        Candidate {
            bbox: BBox::new(x, 0.0, 10.0, 10.0),
            class_id,
            confidence,
            cell: 0,
        }
    }

    #[test]
    fn ties_resolve_by_input_order() {
        let cands = [cand(0.0, 0, 0.7), cand(50.0, 0, 0.9), cand(100.0, 0, 0.7)];
        assert_eq!(sort_by_confidence_desc(&cands), vec![1, 0, 2]);
    }

    #[test]
    fn class_aware_keeps_overlapping_boxes_of_other_classes() {
        let cands = [cand(0.0, 0, 0.9), cand(1.0, 1, 0.8), cand(2.0, 0, 0.7)];
        assert_eq!(nms(&cands, 0.4, SuppressionMode::ClassAware), vec![0, 1]);
        assert_eq!(nms(&cands, 0.4, SuppressionMode::ClassAgnostic), vec![0]);
    }

    #[test]
    fn iou_equal_to_threshold_is_kept() {
        // IoU of boxes offset by 5 px is exactly 1/3.
        let cands = [cand(0.0, 0, 0.9), cand(5.0, 0, 0.8)];
        assert_eq!(
            nms(&cands, 1.0 / 3.0 + 1e-6, SuppressionMode::ClassAware),
            vec![0, 1]
        );
        assert_eq!(nms(&cands, 0.3, SuppressionMode::ClassAware), vec![0]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(nms(&[], 0.4, SuppressionMode::ClassAware).is_empty());
    }
}
