//! Plain-text run summaries.
//!
//! One line per image: `<file>: <label> <confidence> <x> <y> <w> <h>` with
//! several detections joined by `"; "`, `<file>: No detections found` when
//! nothing was kept, or `<file>: error: <message>` for failed items. Box
//! values are rounded to whole pixels.

use crate::detection::Detection;
use crate::engine::{BatchReport, ImageReport};
use crate::labels::LabelTable;
use std::io::{self, Write};

/// Formats one detection as `<label> <confidence> <x> <y> <w> <h>`.
pub fn format_detection(det: &Detection, labels: &LabelTable) -> String {
    let b = det.bbox();
    format!(
        "{} {:.2} {} {} {} {}",
        labels.name_or_id(det.class_id()),
        det.confidence(),
        b.x.round() as i64,
        b.y.round() as i64,
        b.width.round() as i64,
        b.height.round() as i64
    )
}

/// Formats the summary line for one image's detections.
pub fn summary_line(name: &str, detections: &[Detection], labels: &LabelTable) -> String {
    if detections.is_empty() {
        return format!("{name}: No detections found");
    }
    let parts: Vec<String> = detections
        .iter()
        .map(|det| format_detection(det, labels))
        .collect();
    format!("{name}: {}", parts.join("; "))
}

/// Formats the summary line for one batch item.
pub fn report_line(item: &ImageReport, labels: &LabelTable) -> String {
    match &item.outcome {
        Ok(result) => summary_line(&item.name, &result.detections, labels),
        Err(err) => format!("{}: error: {err}", item.name),
    }
}

impl BatchReport {
    /// Summary lines in input order.
    pub fn summary_lines(&self, labels: &LabelTable) -> Vec<String> {
        self.items
            .iter()
            .map(|item| report_line(item, labels))
            .collect()
    }

    /// Writes the summary, one line per image.
    pub fn write_summary<W: Write>(&self, labels: &LabelTable, mut out: W) -> io::Result<()> {
        for line in self.summary_lines(labels) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}
