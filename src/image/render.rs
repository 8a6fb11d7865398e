//! Drawing detections onto RGB buffers (feature `image-io`).

use crate::detection::Detection;
use crate::labels::LabelTable;
use crate::util::{DetectError, DetectResult};
pub use ab_glyph::FontArc;
use ab_glyph::PxScale;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::fs;
use std::path::Path;

/// Box and text color.
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline width in pixels.
pub const BOX_THICKNESS: i32 = 2;
const TEXT_SCALE: f32 = 16.0;
const TEXT_OFFSET: i32 = 5;

/// Loads a TrueType/OpenType font for annotation text.
pub fn load_font<P: AsRef<Path>>(path: P) -> DetectResult<FontArc> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|_| DetectError::MissingFile {
        what: "font",
        path: path.to_path_buf(),
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| DetectError::InvalidConfig("font file is not a valid font"))
}

/// Draws every detection box and, when a font is given, its
/// `"<label>: <confidence>"` annotation just above the box.
pub fn draw_detections(
    canvas: &mut RgbImage,
    detections: &[Detection],
    labels: &LabelTable,
    font: Option<&FontArc>,
) {
    for det in detections {
        let b = det.bbox();
        let x = b.x.round() as i32;
        let y = b.y.round() as i32;
        let w = b.width.round() as i32;
        let h = b.height.round() as i32;

        for inset in 0..BOX_THICKNESS {
            let (iw, ih) = (w - 2 * inset, h - 2 * inset);
            if iw <= 0 || ih <= 0 {
                break;
            }
            let rect = Rect::at(x + inset, y + inset).of_size(iw as u32, ih as u32);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }

        if let Some(font) = font {
            let text = det.annotation(labels);
            let ty = (y - TEXT_OFFSET - TEXT_SCALE as i32).max(0);
            draw_text_mut(canvas, BOX_COLOR, x, ty, PxScale::from(TEXT_SCALE), font, &text);
        }
    }
}
