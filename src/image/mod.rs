//! Pixel buffer views for decoded images.
//!
//! `ImageView` is a borrowed view into an interleaved 1D buffer with an
//! explicit stride. The stride counts elements between the starts of
//! consecutive rows, so a stride larger than `width * channels` represents
//! padded rows. `OwnedImage` is the contiguous owned counterpart used when an
//! image has to outlive its decoder.

use crate::util::{DetectError, DetectResult};

#[cfg(feature = "image-io")]
pub mod io;
#[cfg(feature = "image-io")]
pub mod render;

/// Borrowed interleaved image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width * channels`.
    pub fn from_slice(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
    ) -> DetectResult<Self> {
        let row_len = row_len(width, height, channels)?;
        Self::new(data, width, height, channels, row_len)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> DetectResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(DetectError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the channel values of pixel `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        let end = start.checked_add(self.channels)?;
        self.data.get(start..end)
    }

    /// Returns row `y` without padding (`width * channels` elements).
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }
}

/// Owned contiguous interleaved `u8` image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl OwnedImage {
    /// Wraps a contiguous buffer of exactly `width * height * channels` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> DetectResult<Self> {
        let row = row_len(width, height, channels)?;
        let needed = row
            .checked_mul(height)
            .ok_or(DetectError::InvalidDimensions {
                width,
                height,
                channels,
            })?;
        if data.len() < needed {
            return Err(DetectError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(DetectError::InvalidDimensions {
                width,
                height,
                channels,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Copies a (possibly padded) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> DetectResult<Self> {
        let mut data = Vec::with_capacity(view.width() * view.height() * view.channels());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(DetectError::BufferTooSmall {
                needed: (y + 1) * view.stride(),
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, view.width(), view.height(), view.channels())
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the raw interleaved bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.width * self.channels,
        }
    }
}

fn row_len(width: usize, height: usize, channels: usize) -> DetectResult<usize> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(DetectError::InvalidDimensions {
            width,
            height,
            channels,
        });
    }
    width
        .checked_mul(channels)
        .ok_or(DetectError::InvalidDimensions {
            width,
            height,
            channels,
        })
}

fn required_len(width: usize, height: usize, channels: usize, stride: usize) -> DetectResult<usize> {
    let row_len = row_len(width, height, channels)?;
    if stride < row_len {
        return Err(DetectError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(DetectError::InvalidDimensions {
            width,
            height,
            channels,
        })
}
