use clap::Parser;
use detpost::image::render::{draw_detections, load_font, FontArc};
use detpost::io::{load_rgb_image, to_rgb_image};
use detpost::{
    BatchReport, DetectConfig, Detection, Detector, Engine, InputSize, LabelTable, ModelFiles,
    OutputConvention, ReplayDetector, SuppressionMode,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch object detection post-processing (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Log pipeline progress to stderr.
    #[arg(long)]
    trace: bool,
    /// Also append logs to this file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BackendConfig {
    #[default]
    Replay,
    Onnx,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SuppressionConfig {
    #[default]
    ClassAware,
    ClassAgnostic,
}

impl From<SuppressionConfig> for SuppressionMode {
    fn from(value: SuppressionConfig) -> Self {
        match value {
            SuppressionConfig::ClassAware => SuppressionMode::ClassAware,
            SuppressionConfig::ClassAgnostic => SuppressionMode::ClassAgnostic,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ConventionConfig {
    #[default]
    Darknet,
    Hub,
    Anchorless,
}

impl From<ConventionConfig> for OutputConvention {
    fn from(value: ConventionConfig) -> Self {
        match value {
            ConventionConfig::Darknet => OutputConvention::Darknet,
            ConventionConfig::Hub => OutputConvention::Hub,
            ConventionConfig::Anchorless => OutputConvention::Anchorless,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelConfigJson {
    backend: BackendConfig,
    weights: PathBuf,
    config: Option<PathBuf>,
    labels: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectConfigJson {
    confidence_threshold: f32,
    nms_iou_threshold: f32,
    input_width: usize,
    input_height: usize,
    suppression: SuppressionConfig,
    convention: ConventionConfig,
    timeout_ms: Option<u64>,
    parallel: bool,
}

impl Default for DetectConfigJson {
    fn default() -> Self {
        let cfg = DetectConfig::default();
        Self {
            confidence_threshold: cfg.confidence_threshold,
            nms_iou_threshold: cfg.nms_iou_threshold,
            input_width: cfg.input_size.width,
            input_height: cfg.input_size.height,
            suppression: SuppressionConfig::ClassAware,
            convention: ConventionConfig::Darknet,
            timeout_ms: None,
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectConfigJson> for DetectConfig {
    fn from(value: DetectConfigJson) -> Self {
        Self {
            confidence_threshold: value.confidence_threshold,
            nms_iou_threshold: value.nms_iou_threshold,
            input_size: InputSize::new(value.input_width, value.input_height),
            suppression: value.suppression.into(),
            convention: value.convention.into(),
            inference_timeout: value.timeout_ms.map(Duration::from_millis),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    model: ModelConfigJson,
    detect: DetectConfigJson,
    image_dir: PathBuf,
    output_dir: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.trace && cli.log_file.is_none() {
        return Ok(());
    }
    let filter = EnvFilter::from_default_env().add_directive("detpost=info".parse()?);
    let console = cli
        .trace
        .then(|| tracing_subscriber::fmt::layer().with_target(false));
    let file = match &cli.log_file {
        Some(path) => {
            create_parent_dir(path)?;
            let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => fs::create_dir_all(dir),
        None => Ok(()),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Lists images in `dir`, sorted by file name.
fn discover_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn write_summary_file(
    report: &BatchReport,
    labels: &LabelTable,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    create_parent_dir(path)?;
    report.write_summary(labels, fs::File::create(path)?)?;
    Ok(())
}

fn annotate_image(
    source: &Path,
    target: &Path,
    detections: &[Detection],
    labels: &LabelTable,
    font: Option<&FontArc>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut canvas = to_rgb_image(&load_rgb_image(source)?)?;
    draw_detections(&mut canvas, detections, labels, font);
    canvas.save(target)?;
    Ok(())
}

/// Writes an annotated copy of every successfully processed image.
///
/// Images that cannot be annotated are logged and skipped. Returns the number
/// of files written.
fn save_annotated(
    paths: &[PathBuf],
    report: &BatchReport,
    labels: &LabelTable,
    output_dir: &Path,
    font: Option<&FontArc>,
) -> std::io::Result<usize> {
    fs::create_dir_all(output_dir)?;
    let mut saved = 0;
    for (path, item) in paths.iter().zip(&report.items) {
        let Ok(result) = &item.outcome else {
            continue;
        };
        let out_path = output_dir.join(&item.name);
        match annotate_image(path, &out_path, &result.detections, labels, font) {
            Ok(()) => {
                saved += 1;
                tracing::info!(path = %out_path.display(), "saved annotated image");
            }
            Err(err) => {
                tracing::warn!(image = item.name.as_str(), error = %err, "skipped annotated image");
            }
        }
    }
    Ok(saved)
}

fn run<D: Detector>(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = ModelFiles::new(&config.model.weights, &config.model.labels);
    if let Some(net_config) = &config.model.config {
        files = files.with_config(net_config);
    }
    let engine = Engine::<D>::load(&files, config.detect.into())?;
    let font = config.font_path.as_deref().map(load_font).transpose()?;

    let paths = discover_images(&config.image_dir)?;
    tracing::info!(images = paths.len(), dir = %config.image_dir.display(), "processing images");
    let report = engine.run_batch(&paths);

    for (name, err) in report.failures() {
        tracing::warn!(image = name, error = %err, "skipped image");
    }
    let dropped = report.dropped_total();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped out-of-range candidates");
    }

    match &config.summary_path {
        Some(path) => write_summary_file(&report, engine.labels(), path)?,
        None => report.write_summary(engine.labels(), std::io::stdout().lock())?,
    }

    if let Some(output_dir) = &config.output_dir {
        let saved = save_annotated(&paths, &report, engine.labels(), output_dir, font.as_ref())?;
        tracing::info!(saved, dir = %output_dir.display(), "annotated images written");
    }

    tracing::info!(
        images = report.items.len(),
        failed = report.failures().count(),
        "processing complete"
    );
    engine.shutdown();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_dir.as_os_str().is_empty() {
        return Err("image_dir must be set in the config".into());
    }
    if config.model.weights.as_os_str().is_empty() || config.model.labels.as_os_str().is_empty() {
        return Err("model.weights and model.labels must be set in the config".into());
    }

    match config.model.backend {
        BackendConfig::Replay => run::<ReplayDetector>(config),
        #[cfg(feature = "onnx")]
        BackendConfig::Onnx => run::<detpost::OnnxDetector>(config),
        #[cfg(not(feature = "onnx"))]
        BackendConfig::Onnx => Err("this build has no onnx backend; rebuild with --features onnx".into()),
    }
}
