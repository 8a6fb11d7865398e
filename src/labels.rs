//! Class label tables.
//!
//! A label file holds one class name per line; the line order defines the
//! class id. The table is loaded once and shared read-only by every detection
//! of a run.

use crate::util::{DetectError, DetectResult};
use std::fs;
use std::path::Path;

/// Ordered, index-addressable class names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    /// Builds a table from class names in id order.
    ///
    /// Names are trimmed. Returns [`DetectError::EmptyLabelTable`] when no
    /// names are given.
    pub fn from_lines<I, S>(lines: I) -> DetectResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_owned())
            .collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        if names.is_empty() {
            return Err(DetectError::EmptyLabelTable);
        }
        Ok(Self { names })
    }

    /// Parses newline-delimited label text.
    pub fn parse(text: &str) -> DetectResult<Self> {
        Self::from_lines(text.lines())
    }

    /// Loads a newline-delimited label file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> DetectResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DetectError::MissingFile {
                what: "label",
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|err| DetectError::LabelFile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed table.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name for `class_id`.
    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Returns the name for `class_id`, or `#<id>` when it is out of range.
    pub fn name_or_id(&self, class_id: usize) -> std::borrow::Cow<'_, str> {
        match self.get(class_id) {
            Some(name) => name.into(),
            None => format!("#{class_id}").into(),
        }
    }
}
