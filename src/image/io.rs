//! Convenience helpers for decoding images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Every decoded image is
//! normalized to interleaved RGB.

use crate::image::OwnedImage;
use crate::util::{DetectError, DetectResult};
use std::path::Path;

/// Creates an owned RGB image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> DetectResult<OwnedImage> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    OwnedImage::new(rgb.into_raw(), width, height, 3)
}

/// Converts an owned RGB image back into an `image::RgbImage`.
pub fn to_rgb_image(img: &OwnedImage) -> DetectResult<image::RgbImage> {
    if img.channels() != 3 {
        return Err(DetectError::UnsupportedChannels {
            channels: img.channels(),
            expected: 3,
        });
    }
    image::RgbImage::from_raw(img.width() as u32, img.height() as u32, img.data().to_vec()).ok_or(
        DetectError::BufferTooSmall {
            needed: img.width() * img.height() * 3,
            got: img.data().len(),
        },
    )
}

/// Loads an image from disk and converts it to RGB.
///
/// Missing files and decode failures both surface as
/// [`DetectError::ImageUnreadable`] so batch callers can skip the item.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> DetectResult<OwnedImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| DetectError::ImageUnreadable {
        name: path.display().to_string(),
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}
