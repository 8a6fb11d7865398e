use detpost::{
    DetectConfig, DetectError, DetectResult, Detector, Engine, ErrorKind, ImageSource, ImageView,
    LabelTable, ModelFiles, NamedImage, OwnedImage, RawOutput, RawTensor,
};
use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Emits one confident "dog" box per image, a malformed tensor for images
/// named `bad*`, and sleeps for images named `slow*`.
struct ScriptedDetector;

impl Detector for ScriptedDetector {
    fn load(_files: &ModelFiles, _cfg: &DetectConfig) -> DetectResult<Self> {
        Ok(ScriptedDetector)
    }

    fn infer(&self, name: &str, _image: ImageView<'_, u8>) -> DetectResult<RawOutput> {
        if name.starts_with("bad") {
            return Ok(RawOutput::new(vec![RawTensor::new(vec![1, 1, 1, 8], vec![0.0; 8])]));
        }
        if name.starts_with("slow") {
            std::thread::sleep(Duration::from_millis(60));
        }
        Ok(RawOutput::new(vec![RawTensor::from_rows(&[[
            0.5, 0.5, 0.5, 0.5, 1.0, 0.1, 0.8, 0.1,
        ]])]))
    }
}

struct Unreadable(&'static str);

impl ImageSource for Unreadable {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.0)
    }

    fn load(&self) -> DetectResult<Cow<'_, OwnedImage>> {
        Err(DetectError::ImageUnreadable {
            name: self.0.to_owned(),
            reason: "file not found".into(),
        })
    }
}

enum Input {
    Image(NamedImage),
    Missing(Unreadable),
}

impl ImageSource for Input {
    fn name(&self) -> Cow<'_, str> {
        match self {
            Input::Image(img) => img.name(),
            Input::Missing(src) => src.name(),
        }
    }

    fn load(&self) -> DetectResult<Cow<'_, OwnedImage>> {
        match self {
            Input::Image(img) => img.load(),
            Input::Missing(src) => src.load(),
        }
    }
}

fn image(name: &str) -> Input {
    Input::Image(NamedImage {
        name: name.to_owned(),
        image: OwnedImage::new(vec![0; 40 * 20 * 3], 40, 20, 3).unwrap(),
    })
}

fn labels() -> Arc<LabelTable> {
    Arc::new(LabelTable::from_lines(["cat", "dog", "person"]).unwrap())
}

#[test]
fn failures_are_collected_per_image() {
    let engine = Engine::new(ScriptedDetector, labels(), DetectConfig::default()).unwrap();
    let inputs = vec![
        image("a.jpg"),
        Input::Missing(Unreadable("gone.jpg")),
        image("bad.jpg"),
        image("z.jpg"),
    ];
    let report = engine.run_batch(&inputs);

    assert_eq!(report.items.len(), 4);
    assert_eq!(report.successes().count(), 2);
    let failures: Vec<(&str, ErrorKind)> = report
        .failures()
        .map(|(name, err)| (name, err.kind()))
        .collect();
    assert_eq!(
        failures,
        vec![("gone.jpg", ErrorKind::Input), ("bad.jpg", ErrorKind::Inference)]
    );

    let (_, first) = report.successes().next().unwrap();
    assert_eq!(first.detections.len(), 1);
    assert_eq!(first.detections[0].annotation(engine.labels()), "dog: 0.80");
}

#[test]
fn summary_has_one_line_per_image_in_input_order() {
    let engine = Engine::new(ScriptedDetector, labels(), DetectConfig::default()).unwrap();
    let inputs = vec![image("b.jpg"), Input::Missing(Unreadable("gone.jpg"))];
    let report = engine.run_batch(&inputs);

    let lines = report.summary_lines(engine.labels());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "b.jpg: dog 0.80 10 5 20 10");
    assert!(lines[1].starts_with("gone.jpg: error: image unreadable"));

    let mut written = Vec::new();
    report.write_summary(engine.labels(), &mut written).unwrap();
    assert_eq!(String::from_utf8(written).unwrap().lines().count(), 2);
}

#[test]
fn empty_detections_are_not_errors() {
    let cfg = DetectConfig {
        confidence_threshold: 0.95,
        ..DetectConfig::default()
    };
    let engine = Engine::new(ScriptedDetector, labels(), cfg).unwrap();
    let report = engine.run_batch(&[image("quiet.png")]);
    assert_eq!(report.failures().count(), 0);
    assert_eq!(
        report.summary_lines(engine.labels()),
        vec!["quiet.png: No detections found".to_owned()]
    );
}

#[test]
fn slow_inference_fails_only_that_image() {
    let cfg = DetectConfig {
        inference_timeout: Some(Duration::from_millis(20)),
        ..DetectConfig::default()
    };
    let engine = Engine::new(ScriptedDetector, labels(), cfg).unwrap();
    let report = engine.run_batch(&[image("slow.jpg"), image("fast.jpg")]);

    let (name, err) = report.failures().next().unwrap();
    assert_eq!(name, "slow.jpg");
    assert!(matches!(err, DetectError::InferenceTimeout { limit_ms: 20, .. }));
    assert_eq!(report.successes().count(), 1);
}

#[test]
fn class_count_mismatch_is_an_inference_error() {
    let two_labels = Arc::new(LabelTable::from_lines(["cat", "dog"]).unwrap());
    let engine = Engine::new(ScriptedDetector, two_labels, DetectConfig::default()).unwrap();
    let report = engine.run_batch(&[image("a.jpg")]);
    let (_, err) = report.failures().next().unwrap();
    assert_eq!(
        *err,
        DetectError::ClassCountMismatch {
            expected: 2,
            got: 3
        }
    );
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("detpost-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn load_fails_fast_on_missing_files() {
    let dir = scratch_dir("missing");
    let files = ModelFiles::new(dir.join("yolov3.weights"), dir.join("coco.names"));
    let err = Engine::<ScriptedDetector>::load(&files, DetectConfig::default())
        .err()
        .unwrap();
    assert!(err.kind().is_fatal());
    assert!(matches!(err, DetectError::MissingFile { what: "weights", .. }));
}

#[test]
fn load_reads_label_file() {
    let dir = scratch_dir("labels");
    let weights = dir.join("model.onnx");
    let labels = dir.join("coco.names");
    fs::write(&weights, b"weights").unwrap();
    fs::write(&labels, "cat\ndog\nperson\n").unwrap();

    let engine =
        Engine::<ScriptedDetector>::load(&ModelFiles::new(weights, labels), DetectConfig::default())
            .unwrap();
    assert_eq!(engine.labels().get(2), Some("person"));
    let _detector: ScriptedDetector = engine.shutdown();
}
