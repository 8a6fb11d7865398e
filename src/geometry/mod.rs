//! Axis-aligned boxes in pixel space and overlap measures.
//!
//! Boxes use a top-left origin with `(x, y, width, height)` parameters. The
//! right and bottom edges are exclusive, so two boxes that only share an edge
//! do not overlap.

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl BBox {
    /// Creates a box from its top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a box from its center and size.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Returns the exclusive right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the exclusive bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns the box area, zero for degenerate boxes.
    ///
    /// Measured between the edges, like [`BBox::intersection_area`], so a box
    /// intersected with itself yields exactly its own area.
    pub fn area(&self) -> f32 {
        if self.width <= 0.0 || self.height <= 0.0 {
            return 0.0;
        }
        (self.right() - self.x) * (self.bottom() - self.y)
    }

    /// Returns true when every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Returns the area shared by both boxes.
    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    /// Intersection-over-union of two boxes.
    ///
    /// Returns 0 when the union is empty, so degenerate boxes never divide by
    /// zero.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BBox;

    #[test]
    fn from_center_moves_origin_to_top_left() {
        let b = BBox::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(b, BBox::new(40.0, 35.0, 20.0, 10.0));
        assert_eq!(b.right(), 60.0);
        assert_eq!(b.bottom(), 45.0);
    }

    #[test]
    fn half_overlap_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn self_iou_is_exactly_one_for_offset_boxes() {
        let b = BBox::new(54.160217, -42.420673, 17.535109, 37.196804);
        assert_eq!(b.intersection_area(&b), b.area());
        assert_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let point = BBox::new(3.0, 3.0, 0.0, 0.0);
        assert_eq!(point.iou(&point), 0.0);
        let negative = BBox::new(0.0, 0.0, -4.0, 2.0);
        assert_eq!(negative.area(), 0.0);
    }
}
