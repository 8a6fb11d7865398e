#![cfg(feature = "replay")]

use detpost::{
    DetectConfig, DetectError, Engine, ErrorKind, ModelFiles, NamedImage, OwnedImage, RawOutput,
    RawTensor, ReplayDetector,
};
use std::fs;
use std::path::PathBuf;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("detpost-replay-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn named(name: &str) -> NamedImage {
    NamedImage {
        name: name.to_owned(),
        image: OwnedImage::new(vec![0; 100 * 50 * 3], 100, 50, 3).unwrap(),
    }
}

#[test]
fn replays_recorded_outputs_by_image_stem() {
    let dir = scratch_dir("ok");
    let recordings = dir.join("recordings");
    fs::create_dir_all(&recordings).unwrap();
    let labels = dir.join("labels.txt");
    fs::write(&labels, "tablet\nsyringe\n").unwrap();

    let output = RawOutput::new(vec![RawTensor::from_rows(&[[
        0.5, 0.5, 0.2, 0.4, 1.0, 0.1, 0.75,
    ]])]);
    fs::write(
        recordings.join("photo_1.json"),
        serde_json::to_string(&output).unwrap(),
    )
    .unwrap();
    fs::write(recordings.join("broken.json"), "{ not json").unwrap();

    let engine = Engine::<ReplayDetector>::load(
        &ModelFiles::new(&recordings, &labels),
        DetectConfig::default(),
    )
    .unwrap();
    let report = engine.run_batch(&[named("photo_1.jpg"), named("broken.jpg"), named("none.jpg")]);

    assert_eq!(
        report.summary_lines(engine.labels())[0],
        "photo_1.jpg: syringe 0.75 40 15 20 20"
    );
    let kinds: Vec<ErrorKind> = report.failures().map(|(_, err)| err.kind()).collect();
    assert_eq!(kinds, vec![ErrorKind::Inference, ErrorKind::Inference]);
}

#[test]
fn weights_must_be_a_directory() {
    let dir = scratch_dir("file");
    let weights = dir.join("weights.bin");
    let labels = dir.join("labels.txt");
    fs::write(&weights, b"x").unwrap();
    fs::write(&labels, "a\n").unwrap();

    let err = Engine::<ReplayDetector>::load(&ModelFiles::new(&weights, &labels), DetectConfig::default())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DetectError::MissingFile {
            what: "replay directory",
            ..
        }
    ));
}
