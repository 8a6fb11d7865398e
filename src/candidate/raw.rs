//! Raw network outputs and per-cell prediction views.

use crate::config::OutputConvention;
use crate::util::{DetectError, DetectResult};

/// One dense `f32` output layer of a detector.
///
/// Layers are `[cells, values]` matrices (or `[values, cells]` for the
/// anchor-free convention), optionally with a leading batch dimension of 1.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Builds a `[rows.len(), width]` tensor from equally sized rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Self {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let data: Vec<f32> = rows
            .iter()
            .flat_map(|row| row.as_ref().iter().copied())
            .collect();
        Self::new(vec![rows.len(), width], data)
    }

    /// Returns `(rows, cols)` after stripping a leading batch dimension of 1.
    pub(crate) fn matrix_dims(&self, layer: usize) -> DetectResult<(usize, usize)> {
        let dims = match self.shape.as_slice() {
            [rows, cols] => (*rows, *cols),
            [1, rows, cols] => (*rows, *cols),
            [batch, _, _] => {
                return Err(DetectError::malformed(
                    layer,
                    format!("batch dimension must be 1, got {batch}"),
                ))
            }
            other => {
                return Err(DetectError::malformed(
                    layer,
                    format!("expected rank 2 or 3, got rank {}", other.len()),
                ))
            }
        };
        let expected = dims.0.checked_mul(dims.1).ok_or_else(|| {
            DetectError::malformed(layer, "shape overflows the address space")
        })?;
        if expected != self.data.len() {
            return Err(DetectError::malformed(
                layer,
                format!(
                    "shape {:?} needs {expected} values, got {}",
                    self.shape,
                    self.data.len()
                ),
            ));
        }
        Ok(dims)
    }
}

/// All output layers of one inference call.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawOutput {
    pub layers: Vec<RawTensor>,
}

impl RawOutput {
    pub fn new(layers: Vec<RawTensor>) -> Self {
        Self { layers }
    }
}

/// Strided view over the class scores of one cell.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scores<'a> {
    data: &'a [f32],
    start: usize,
    step: usize,
    len: usize,
}

impl Scores<'_> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.data[self.start..]
            .iter()
            .step_by(self.step)
            .take(self.len)
            .copied()
    }

    /// Index and value of the maximum score; the lowest index wins ties.
    pub(crate) fn argmax(&self) -> Option<(usize, f32)> {
        let mut iter = self.iter().enumerate();
        let mut best = iter.next()?;
        for (idx, score) in iter {
            if score > best.1 {
                best = (idx, score);
            }
        }
        Some(best)
    }
}

/// Borrowed view of one anchor/cell of the raw output.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawPrediction<'a> {
    /// Running cell index across all layers.
    pub cell: usize,
    /// `[cx, cy, w, h]` in the convention's coordinate space.
    pub box_params: [f32; 4],
    pub objectness: Option<f32>,
    pub scores: Scores<'a>,
}

/// Decodes every cell of one layer into prediction views.
pub(crate) fn layer_predictions<'a>(
    tensor: &'a RawTensor,
    layer: usize,
    first_cell: usize,
    convention: OutputConvention,
) -> DetectResult<Vec<RawPrediction<'a>>> {
    let (rows, cols) = tensor.matrix_dims(layer)?;
    let data = tensor.data.as_slice();
    let head = convention.box_params();

    let predictions = match convention {
        OutputConvention::Darknet | OutputConvention::Hub => {
            if rows > 0 && cols <= head {
                return Err(DetectError::malformed(
                    layer,
                    format!("rows need more than {head} values, got {cols}"),
                ));
            }
            (0..rows)
                .map(|row| {
                    let base = row * cols;
                    let v = &data[base..base + cols];
                    RawPrediction {
                        cell: first_cell + row,
                        box_params: [v[0], v[1], v[2], v[3]],
                        objectness: Some(v[4]),
                        scores: Scores {
                            data,
                            start: base + head,
                            step: 1,
                            len: cols - head,
                        },
                    }
                })
                .collect()
        }
        OutputConvention::Anchorless => {
            // [values, cells]: each cell is a column.
            let (values, cells) = (rows, cols);
            if cells > 0 && values <= head {
                return Err(DetectError::malformed(
                    layer,
                    format!("columns need more than {head} values, got {values}"),
                ));
            }
            (0..cells)
                .map(|col| RawPrediction {
                    cell: first_cell + col,
                    box_params: [
                        data[col],
                        data[cells + col],
                        data[2 * cells + col],
                        data[3 * cells + col],
                    ],
                    objectness: None,
                    scores: Scores {
                        data,
                        start: head * cells + col,
                        step: cells,
                        len: values - head,
                    },
                })
                .collect()
        }
    };
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::{layer_predictions, RawTensor};
    use crate::config::OutputConvention;
    use crate::util::ErrorKind;

    #[test]
    fn batch_dimension_is_stripped() {
        let tensor = RawTensor::new(vec![1, 2, 7], vec![0.0; 14]);
        assert_eq!(tensor.matrix_dims(0).unwrap(), (2, 7));
    }

    #[test]
    fn wrong_rank_and_length_are_malformed() {
        let rank4 = RawTensor::new(vec![1, 1, 2, 7], vec![0.0; 14]);
        assert_eq!(rank4.matrix_dims(0).unwrap_err().kind(), ErrorKind::Inference);
        let short = RawTensor::new(vec![2, 7], vec![0.0; 13]);
        assert!(short.matrix_dims(3).is_err());
    }

    #[test]
    fn anchorless_reads_columns() {
        // 2 cells, 4 box values + 2 classes, stored [values, cells].
        let data = vec![
            10.0, 20.0, // cx
            11.0, 21.0, // cy
            4.0, 6.0, // w
            5.0, 7.0, // h
            0.1, 0.7, // class 0
            0.9, 0.2, // class 1
        ];
        let tensor = RawTensor::new(vec![6, 2], data);
        let preds = layer_predictions(&tensor, 0, 0, OutputConvention::Anchorless).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[1].box_params, [20.0, 21.0, 6.0, 7.0]);
        assert_eq!(preds[0].scores.argmax(), Some((1, 0.9)));
        assert_eq!(preds[1].scores.argmax(), Some((0, 0.7)));
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        let tensor = RawTensor::from_rows(&[[0.5, 0.5, 0.1, 0.1, 1.0, 0.6, 0.6, 0.2]]);
        let preds = layer_predictions(&tensor, 0, 0, OutputConvention::Darknet).unwrap();
        assert_eq!(preds[0].scores.len(), 3);
        assert_eq!(preds[0].scores.argmax(), Some((0, 0.6)));
    }
}
