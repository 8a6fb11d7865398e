//! ONNX Runtime backend (feature `onnx`).
//!
//! The image is resized to the configured input size with bilinear
//! filtering, scaled to `0..1` and laid out as a planar `1x3xHxW` RGB tensor.
//! Every session output becomes one [`RawTensor`] layer, in output order.

use crate::candidate::raw::{RawOutput, RawTensor};
use crate::config::{DetectConfig, InputSize};
use crate::image::ImageView;
use crate::model::{Detector, ModelFiles};
use crate::trace::trace_event;
use crate::util::{DetectError, DetectResult};
use image::imageops::FilterType;
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;

/// Detector backed by an `ort` session.
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_size: InputSize,
}

impl OnnxDetector {
    fn input_tensor(&self, image: ImageView<'_, u8>) -> DetectResult<Tensor<f32>> {
        if image.channels() != 3 {
            return Err(DetectError::UnsupportedChannels {
                channels: image.channels(),
                expected: 3,
            });
        }
        let mut packed = Vec::with_capacity(image.width() * image.height() * 3);
        for y in 0..image.height() {
            let row = image.row(y).ok_or(DetectError::BufferTooSmall {
                needed: (y + 1) * image.stride(),
                got: image.as_slice().len(),
            })?;
            packed.extend_from_slice(row);
        }
        let rgb = image::RgbImage::from_raw(image.width() as u32, image.height() as u32, packed)
            .ok_or(DetectError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                channels: 3,
            })?;

        let (w, h) = (self.input_size.width, self.input_size.height);
        let resized = image::imageops::resize(&rgb, w as u32, h as u32, FilterType::Triangle);
        let plane = w * h;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let idx = y as usize * w + x as usize;
            data[idx] = pixel[0] as f32 / 255.0;
            data[plane + idx] = pixel[1] as f32 / 255.0;
            data[2 * plane + idx] = pixel[2] as f32 / 255.0;
        }
        Tensor::from_array(([1usize, 3, h, w], data))
            .map_err(|err| DetectError::Backend(err.to_string()))
    }
}

impl Detector for OnnxDetector {
    fn load(files: &ModelFiles, cfg: &DetectConfig) -> DetectResult<Self> {
        if !files.weights.is_file() {
            return Err(DetectError::MissingFile {
                what: "weights",
                path: files.weights.clone(),
            });
        }
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(&files.weights))
            .map_err(|err| DetectError::ModelLoad {
                reason: err.to_string(),
            })?;
        trace_event!("model_loaded", input_width = cfg.input_size.width);
        Ok(Self {
            session: Mutex::new(session),
            input_size: cfg.input_size,
        })
    }

    fn infer(&self, _name: &str, image: ImageView<'_, u8>) -> DetectResult<RawOutput> {
        let input = self.input_tensor(image)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Backend("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|err| DetectError::Backend(err.to_string()))?;

        let mut layers = Vec::new();
        for (layer, (_, value)) in outputs.iter().enumerate() {
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|err| DetectError::malformed(layer, err.to_string()))?;
            let shape = shape.iter().map(|&d| d.max(0) as usize).collect();
            layers.push(RawTensor::new(shape, data.to_vec()));
        }
        Ok(RawOutput::new(layers))
    }
}
