//! Final detections handed to renderers and persisters.

use crate::geometry::BBox;
use crate::labels::LabelTable;
use crate::util::{DetectError, DetectResult};

/// A kept detection in original-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Detection {
    bbox: BBox,
    class_id: usize,
    confidence: f32,
}

impl Detection {
    /// Creates a detection, rejecting values outside the declared ranges.
    ///
    /// The confidence must be finite and within `[0, 1]`; the box must be
    /// finite with non-negative width and height.
    pub fn new(bbox: BBox, class_id: usize, confidence: f32) -> DetectResult<Self> {
        check_ranges(&bbox, confidence).map_err(DetectError::InvalidCandidate)?;
        Ok(Self {
            bbox,
            class_id,
            confidence,
        })
    }

    /// Returns the box in pixel coordinates.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Returns the index into the label table.
    pub fn class_id(&self) -> usize {
        self.class_id
    }

    /// Returns the detection confidence.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Formats `"<label>: <confidence>"` with two decimals.
    pub fn annotation(&self, labels: &LabelTable) -> String {
        format!(
            "{}: {:.2}",
            labels.name_or_id(self.class_id),
            self.confidence
        )
    }
}

pub(crate) fn check_ranges(bbox: &BBox, confidence: f32) -> Result<(), &'static str> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err("confidence outside [0, 1]");
    }
    if !bbox.is_finite() {
        return Err("non-finite box");
    }
    if bbox.width < 0.0 || bbox.height < 0.0 {
        return Err("negative box size");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Detection;
    use crate::geometry::BBox;
    use crate::labels::LabelTable;
    use crate::util::DetectError;

    #[test]
    fn annotation_uses_label_and_two_decimals() {
        let labels = LabelTable::from_lines(["cat", "dog", "person"]).unwrap();
        let det = Detection::new(BBox::new(1.0, 2.0, 3.0, 4.0), 2, 0.876).unwrap();
        assert_eq!(det.annotation(&labels), "person: 0.88");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let b = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            Detection::new(b, 0, 1.5).unwrap_err(),
            DetectError::InvalidCandidate("confidence outside [0, 1]")
        );
        assert!(Detection::new(b, 0, f32::NAN).is_err());
        assert!(Detection::new(BBox::new(0.0, 0.0, -1.0, 1.0), 0, 0.5).is_err());
    }
}
