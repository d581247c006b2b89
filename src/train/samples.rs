use crate::error::{Error, Result};
use crate::math::matrix::MatrixView;

/// An immutable dataset over caller memory plus a batch cursor.
///
/// `inputs` is `features × size` with one column per sample. The optional
/// `expected_outputs` (`outputs × size`, one-hot) and `expected_indices` (`size`
/// class indices) are co-indexed with `inputs`: every `slide` moves all of them
/// to the same window.
#[derive(Debug, Clone)]
pub struct TrainingSamples<'a> {
    inputs: MatrixView<'a>,
    expected_outputs: Option<MatrixView<'a>>,
    expected_indices: Option<&'a [usize]>,
    batch_size: usize,
}

impl<'a> TrainingSamples<'a> {
    /// Inference-only samples. A `batch_size` of 0 processes the whole dataset as one batch.
    pub fn new(batch_size: usize, inputs: MatrixView<'a>) -> TrainingSamples<'a> {
        let mut inputs = inputs;
        let size = inputs.capacity();
        inputs.slide(0, size);
        TrainingSamples {
            inputs,
            expected_outputs: None,
            expected_indices: None,
            batch_size: if batch_size == 0 { size } else { batch_size },
        }
    }

    /// Attaches one-hot expected outputs, one column per sample.
    pub fn with_expected_outputs(mut self, expected: MatrixView<'a>) -> Result<TrainingSamples<'a>> {
        if expected.capacity() != self.size() {
            return Err(Error::DimensionMismatch {
                what: "expected outputs samples",
                expected: self.size(),
                actual: expected.capacity(),
            });
        }
        let mut expected = expected;
        expected.slide(self.inputs.offset(), self.inputs.columns());
        self.expected_outputs = Some(expected);
        Ok(self)
    }

    /// Attaches the expected class index of every sample.
    pub fn with_expected_indices(mut self, indices: &'a [usize]) -> Result<TrainingSamples<'a>> {
        if indices.len() != self.size() {
            return Err(Error::DimensionMismatch {
                what: "expected indices",
                expected: self.size(),
                actual: indices.len(),
            });
        }
        self.expected_indices = Some(indices);
        Ok(self)
    }

    /// Total number of samples.
    pub fn size(&self) -> usize {
        self.inputs.capacity()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn features(&self) -> usize {
        self.inputs.rows()
    }

    /// Rows of the expected outputs, if present.
    pub fn outputs(&self) -> Option<usize> {
        self.expected_outputs.as_ref().map(|m| m.rows())
    }

    /// Start of the current window.
    pub fn offset(&self) -> usize {
        self.inputs.offset()
    }

    /// Inputs restricted to the current window.
    pub fn inputs(&self) -> &MatrixView<'a> {
        &self.inputs
    }

    /// Expected outputs restricted to the current window.
    pub fn expected_outputs(&self) -> Option<&MatrixView<'a>> {
        self.expected_outputs.as_ref()
    }

    /// Expected class indices of the whole dataset, ignoring the window.
    pub fn expected_indices(&self) -> Option<&'a [usize]> {
        self.expected_indices
    }

    pub fn has_expectations(&self) -> bool {
        self.expected_outputs.is_some() || self.expected_indices.is_some()
    }

    /// Expected class of column `c` of the current window. Falls back to the
    /// arg-max of the expected outputs when no indices were attached.
    pub fn expected_index(&self, c: usize) -> Option<usize> {
        match (self.expected_indices, &self.expected_outputs) {
            (Some(indices), _) => Some(indices[self.inputs.offset() + c]),
            (None, Some(outputs)) => Some(outputs.max_row_index(c)),
            (None, None) => None,
        }
    }

    /// Moves every co-indexed window to `(offset, columns)` and returns the
    /// effective batch width.
    pub fn slide(&mut self, offset: usize, columns: usize) -> usize {
        let res = self.inputs.slide(offset, columns);
        if let Some(expected) = self.expected_outputs.as_mut() {
            expected.slide(offset, columns);
        }
        res
    }

    /// Resets the windows to the whole dataset.
    pub fn rewind(&mut self) {
        let size = self.size();
        self.slide(0, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;

    #[test]
    fn batches_of_three_over_ten_samples() {
        let data: Vec<f64> = (0..20).map(f64::from).collect();
        let inputs = Matrix::wrap(2, 10, &data[..]).unwrap();
        let mut samples = TrainingSamples::new(3, inputs);

        let mut offsets = Vec::new();
        let mut widths = Vec::new();
        let mut offset = 0;
        while offset < samples.size() {
            let width = samples.slide(offset, samples.batch_size());
            offsets.push(samples.offset());
            widths.push(width);
            offset += width;
        }
        assert_eq!(offsets, vec![0, 3, 6, 9]);
        assert_eq!(widths, vec![3, 3, 3, 1]);
        assert_eq!(samples.inputs().column(0), &[18.0, 19.0]);

        samples.rewind();
        assert_eq!((samples.offset(), samples.inputs().columns()), (0, 10));
    }

    #[test]
    fn expected_outputs_move_with_inputs() {
        let inputs = [0.0; 8];
        let expected = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let mut samples = TrainingSamples::new(2, Matrix::wrap(2, 4, &inputs[..]).unwrap())
            .with_expected_outputs(Matrix::wrap(2, 4, &expected[..]).unwrap())
            .unwrap();

        samples.slide(2, 2);
        let window = samples.expected_outputs().unwrap();
        assert_eq!((window.offset(), window.columns()), (2, 2));
        assert_eq!(samples.expected_index(0), Some(1));
        assert_eq!(samples.expected_index(1), Some(0));
        assert_eq!(samples.outputs(), Some(2));
    }

    #[test]
    fn expected_indices_take_precedence() {
        let inputs = [0.0; 3];
        let expected = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let indices = [1, 1, 0];
        let mut samples = TrainingSamples::new(1, Matrix::wrap(1, 3, &inputs[..]).unwrap())
            .with_expected_outputs(Matrix::wrap(2, 3, &expected[..]).unwrap())
            .unwrap()
            .with_expected_indices(&indices)
            .unwrap();
        samples.slide(1, 1);
        assert_eq!(samples.expected_index(0), Some(1));
    }

    #[test]
    fn zero_batch_size_means_whole_dataset() {
        let inputs = [0.0; 5];
        let samples = TrainingSamples::new(0, Matrix::wrap(1, 5, &inputs[..]).unwrap());
        assert_eq!(samples.batch_size(), 5);
        assert!(!samples.has_expectations());
        assert_eq!(samples.expected_index(0), None);
    }

    #[test]
    fn rejects_misaligned_expectations() {
        let inputs = [0.0; 4];
        let expected = [0.0; 6];
        let samples = TrainingSamples::new(2, Matrix::wrap(1, 4, &inputs[..]).unwrap());
        assert!(matches!(
            samples.clone().with_expected_outputs(Matrix::wrap(2, 3, &expected[..]).unwrap()),
            Err(Error::DimensionMismatch { expected: 4, actual: 3, .. })
        ));
        assert!(matches!(
            samples.with_expected_indices(&[0, 1]),
            Err(Error::DimensionMismatch { expected: 4, actual: 2, .. })
        ));
    }
}
