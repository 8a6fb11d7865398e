#![cfg(feature = "rayon")]

use detpost::{
    DetectConfig, DetectResult, Detector, Engine, ImageView, LabelTable, ModelFiles, NamedImage,
    OwnedImage, RawOutput, RawTensor,
};
use std::sync::Arc;

/// Derives a deterministic raw output from the image's first pixel.
struct PixelSeeded;

impl Detector for PixelSeeded {
    fn load(_files: &ModelFiles, _cfg: &DetectConfig) -> DetectResult<Self> {
        Ok(PixelSeeded)
    }

    fn infer(&self, _name: &str, image: ImageView<'_, u8>) -> DetectResult<RawOutput> {
        let seed = image.pixel(0, 0).map_or(0, |p| p[0]) as f32;
        let rows: Vec<[f32; 7]> = (0..40)
            .map(|i| {
                let t = (seed + i as f32) * 0.37;
                [
                    0.2 + 0.6 * t.sin().abs(),
                    0.2 + 0.6 * t.cos().abs(),
                    0.1 + 0.2 * (t * 1.3).sin().abs(),
                    0.1 + 0.2 * (t * 0.7).cos().abs(),
                    1.0,
                    (t * 2.1).sin().abs(),
                    (t * 1.7).cos().abs(),
                ]
            })
            .collect();
        if seed as u8 % 7 == 3 {
            return Ok(RawOutput::new(vec![RawTensor::new(vec![2, 2], vec![0.0; 3])]));
        }
        Ok(RawOutput::new(vec![RawTensor::from_rows(&rows)]))
    }
}

#[test]
fn parallel_batch_matches_sequential() {
    let labels = Arc::new(LabelTable::from_lines(["pill", "bottle"]).unwrap());
    let inputs: Vec<NamedImage> = (0u8..32)
        .map(|i| NamedImage {
            name: format!("img_{i:02}.png"),
            image: OwnedImage::new(vec![i; 64 * 48 * 3], 64, 48, 3).unwrap(),
        })
        .collect();

    let seq = Engine::new(PixelSeeded, labels.clone(), DetectConfig::default()).unwrap();
    let par = Engine::new(
        PixelSeeded,
        labels.clone(),
        DetectConfig {
            parallel: true,
            ..DetectConfig::default()
        },
    )
    .unwrap();

    let seq_report = seq.run_batch(&inputs);
    let par_report = par.run_batch(&inputs);

    assert_eq!(seq_report, par_report);
    assert!(seq_report.failures().count() > 0);
    assert!(seq_report.successes().any(|(_, r)| !r.detections.is_empty()));
    assert_eq!(
        seq_report.summary_lines(&labels),
        par_report.summary_lines(&labels)
    );
}
