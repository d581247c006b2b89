use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Error, Result};
use crate::math::matrix::{Matrix, Storage};

/// A fully-connected sigmoid layer mapping `features` inputs to `neurons` outputs.
///
/// `weights` has shape `(neurons, features)` and `biases` shape `(neurons, 1)`,
/// both in the column-major [`Matrix`] layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    weights: Matrix,
    biases: Matrix,
}

impl Layer {
    /// A layer with every weight and bias set to zero.
    pub fn zeros(neurons: usize, features: usize) -> Result<Layer> {
        Ok(Layer {
            weights: Matrix::try_zeros(neurons, features)?,
            biases: Matrix::try_zeros(neurons, 1)?,
        })
    }

    /// Gaussian initialization: weights sampled from N(0, 1 / sqrt(features)),
    /// biases start at zero.
    pub fn xavier<R: Rng + ?Sized>(neurons: usize, features: usize, rng: &mut R) -> Result<Layer> {
        let std_dev = (1.0 / features as f64).sqrt();
        let mut layer = Layer::zeros(neurons, features)?;
        for w in layer.weights.as_mut_slice() {
            let n: f64 = rng.sample(StandardNormal);
            *w = n * std_dev;
        }
        Ok(layer)
    }

    /// Builds a layer from row-major `neurons × features` weights and `neurons` biases.
    pub fn from_parameters(
        neurons: usize,
        features: usize,
        weights: &[f64],
        biases: &[f64],
    ) -> Result<Layer> {
        let count = neurons
            .checked_mul(features)
            .ok_or(Error::Allocation { values: usize::MAX })?;
        if weights.len() != count {
            return Err(Error::DimensionMismatch {
                what: "layer weights",
                expected: count,
                actual: weights.len(),
            });
        }
        if biases.len() != neurons {
            return Err(Error::DimensionMismatch {
                what: "layer biases",
                expected: neurons,
                actual: biases.len(),
            });
        }
        let mut layer = Layer::zeros(neurons, features)?;
        for (neuron, row) in weights.chunks_exact(features.max(1)).enumerate().take(neurons) {
            for (feature, &w) in row.iter().enumerate() {
                layer.weights.set(neuron, feature, w);
            }
        }
        layer.biases.as_mut_slice().copy_from_slice(biases);
        Ok(layer)
    }

    pub fn neurons(&self) -> usize {
        self.weights.rows()
    }

    pub fn features(&self) -> usize {
        self.weights.columns()
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    pub fn weight(&self, neuron: usize, feature: usize) -> f64 {
        self.weights.get(neuron, feature)
    }

    pub fn bias(&self, neuron: usize) -> f64 {
        self.biases.get(neuron, 0)
    }

    /// Appends the weights in row-major `neurons × features` order.
    pub fn write_weights(&self, out: &mut Vec<f64>) {
        for neuron in 0..self.neurons() {
            out.extend((0..self.features()).map(|feature| self.weight(neuron, feature)));
        }
    }

    pub fn write_biases(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(self.biases.as_slice());
    }

    /// Applies pre-computed gradients scaled by lr: `w -= lr * wgrad`, `b -= lr * bgrad`.
    pub fn apply_gradients<W: Storage, B: Storage>(
        &mut self,
        weights_grad: &Matrix<W>,
        biases_grad: &Matrix<B>,
        lr: f64,
    ) {
        assert_eq!(weights_grad.rows(), self.weights.rows());
        assert_eq!(weights_grad.columns(), self.weights.columns());
        assert_eq!(biases_grad.rows(), self.biases.rows());

        for (w, g) in self.weights.as_mut_slice().iter_mut().zip(weights_grad.as_slice()) {
            *w -= lr * g;
        }
        for (b, g) in self.biases.as_mut_slice().iter_mut().zip(biases_grad.as_slice()) {
            *b -= lr * g;
        }
    }
}
