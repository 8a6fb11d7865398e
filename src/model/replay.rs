//! Replays raw outputs recorded by an external runtime.
//!
//! Available with the `replay` feature. The weights path is a directory with
//! one `<image stem>.json` file per image, each holding a serialized
//! [`RawOutput`].

use crate::candidate::raw::RawOutput;
use crate::config::DetectConfig;
use crate::image::ImageView;
use crate::model::{Detector, ModelFiles};
use crate::util::{DetectError, DetectResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Detector that reads recorded network outputs from disk.
#[derive(Clone, Debug)]
pub struct ReplayDetector {
    dir: PathBuf,
}

impl ReplayDetector {
    /// Path of the recording consulted for image `name`.
    pub fn recording_path(&self, name: &str) -> PathBuf {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_owned());
        self.dir.join(format!("{stem}.json"))
    }
}

impl Detector for ReplayDetector {
    fn load(files: &ModelFiles, _cfg: &DetectConfig) -> DetectResult<Self> {
        if !files.weights.is_dir() {
            return Err(DetectError::MissingFile {
                what: "replay directory",
                path: files.weights.clone(),
            });
        }
        Ok(Self {
            dir: files.weights.clone(),
        })
    }

    fn infer(&self, name: &str, _image: ImageView<'_, u8>) -> DetectResult<RawOutput> {
        let path = self.recording_path(name);
        let text = fs::read_to_string(&path).map_err(|err| {
            DetectError::Backend(format!("no recording at {}: {err}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|err| DetectError::malformed(0, err.to_string()))
    }
}
