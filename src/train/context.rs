use tracing::debug;

use crate::activation::{sigmoid, sigmoid_prime};
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::{Matrix, Storage};
use crate::optim::sgd::Sgd;
use crate::train::samples::TrainingSamples;

/// Scratch tensors of one layer.
#[derive(Debug)]
struct LayerScratch {
    /// Pre-activations, `neurons × batch`.
    z: Matrix,
    /// Activations, `neurons × batch`. Holds the error term during the backward pass.
    a: Matrix,
    /// `neurons × features`
    wgrad: Matrix,
    /// `neurons × 1`
    bgrad: Matrix,
}

/// Per-network scratch state for forward, backward and update passes.
///
/// The batch-shaped buffers (`z`, `a`) only ever grow: a batch no wider than the
/// current capacity reuses the same storage with a narrower window.
#[derive(Debug)]
pub struct TrainingContext {
    layers: Vec<LayerScratch>,
    capacity: usize,
}

impl TrainingContext {
    pub fn new(layers: &[Layer]) -> Result<TrainingContext> {
        let layers = layers
            .iter()
            .map(|layer| {
                Ok(LayerScratch {
                    z: Matrix::try_zeros(layer.neurons(), 0)?,
                    a: Matrix::try_zeros(layer.neurons(), 0)?,
                    wgrad: Matrix::try_zeros(layer.neurons(), layer.features())?,
                    bgrad: Matrix::try_zeros(layer.neurons(), 1)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TrainingContext { layers, capacity: 0 })
    }

    /// Widest batch the scratch buffers currently hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Width of the batch the buffers are currently shaped to.
    pub fn batch_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.a.columns())
    }

    /// Shapes every batch buffer to `batch_size` columns, growing storage if needed.
    pub fn ensure_capacity(&mut self, batch_size: usize) -> Result<()> {
        let mut grown = false;
        for scratch in &mut self.layers {
            grown |= scratch.z.ensure_capacity(batch_size)?;
            grown |= scratch.a.ensure_capacity(batch_size)?;
        }
        if grown {
            debug!(from = self.capacity, to = batch_size, "grew training context");
            self.capacity = batch_size;
        }
        Ok(())
    }

    /// Activations of the last layer for the current batch.
    pub fn output(&self) -> &Matrix {
        match self.layers.last() {
            Some(scratch) => &scratch.a,
            None => unreachable!("a network always has at least one layer"),
        }
    }

    pub fn weights_gradient(&self, layer: usize) -> &Matrix {
        &self.layers[layer].wgrad
    }

    pub fn biases_gradient(&self, layer: usize) -> &Matrix {
        &self.layers[layer].bgrad
    }

    /// Computes `z = W · inputs + b` and `a = sigmoid(z)` for every layer.
    pub fn forward<S: Storage>(&mut self, layers: &[Layer], inputs: &Matrix<S>) -> Result<()> {
        self.check_layers(layers)?;
        let features = layers[0].features();
        if inputs.rows() != features {
            return Err(Error::DimensionMismatch {
                what: "batch features",
                expected: features,
                actual: inputs.rows(),
            });
        }
        self.ensure_capacity(inputs.columns())?;

        for (index, layer) in layers.iter().enumerate() {
            let (done, rest) = self.layers.split_at_mut(index);
            let LayerScratch { z, a, .. } = &mut rest[0];
            match done.last() {
                Some(previous) => feed_forward(layer, &previous.a, z, a),
                None => feed_forward(layer, inputs, z, a),
            }
        }
        Ok(())
    }

    /// Turns the output activations into the cost derivative `a - expected`.
    ///
    /// Uses the batch's one-hot expected outputs, or an implicit one-hot of the
    /// expected indices when only those are present.
    pub fn cost_derivative(&mut self, samples: &TrainingSamples<'_>) -> Result<()> {
        let output = match self.layers.last_mut() {
            Some(scratch) => &mut scratch.a,
            None => return Err(Error::InvalidTopology("no layers".to_owned())),
        };
        if let Some(expected) = samples.expected_outputs() {
            if expected.rows() != output.rows() {
                return Err(Error::DimensionMismatch {
                    what: "expected outputs rows",
                    expected: output.rows(),
                    actual: expected.rows(),
                });
            }
            output.sub(expected);
            return Ok(());
        }
        let outputs = output.rows();
        for c in 0..output.columns() {
            let index = samples.expected_index(c).ok_or(Error::MissingExpectations)?;
            match output.column_mut(c).get_mut(index) {
                Some(value) => *value -= 1.0,
                None => {
                    return Err(Error::DimensionMismatch {
                        what: "expected index",
                        expected: outputs,
                        actual: index,
                    })
                }
            }
        }
        Ok(())
    }

    /// Backpropagates through `layer`, filling its gradients and, for hidden
    /// layers, overwriting the previous layer's activations with its error term.
    ///
    /// `inputs` are the raw batch features; they are only read for layer 0.
    pub fn backward<S: Storage>(&mut self, layer: usize, layers: &[Layer], inputs: &Matrix<S>) {
        let (done, rest) = self.layers.split_at_mut(layer);
        let scratch = &mut rest[0];
        match done.last_mut() {
            Some(previous) => {
                compute_gradients(scratch, &previous.a);
                propagate_error(&layers[layer], &scratch.a, &mut previous.a);
            }
            None => compute_gradients(scratch, inputs),
        }
    }

    /// Runs `backward` from the output layer down to layer 0.
    pub fn backward_all<S: Storage>(&mut self, layers: &[Layer], inputs: &Matrix<S>) {
        for layer in (0..layers.len()).rev() {
            self.backward(layer, layers, inputs);
        }
    }

    /// Applies the accumulated gradients of every layer.
    pub fn update_network(&self, layers: &mut [Layer], optimizer: &Sgd) {
        let samples = self.batch_size();
        for (layer, scratch) in layers.iter_mut().zip(&self.layers) {
            optimizer.step(layer, &scratch.wgrad, &scratch.bgrad, samples);
        }
    }

    fn check_layers(&self, layers: &[Layer]) -> Result<()> {
        if layers.len() != self.layers.len() {
            return Err(Error::DimensionMismatch {
                what: "context layers",
                expected: self.layers.len(),
                actual: layers.len(),
            });
        }
        Ok(())
    }
}

fn feed_forward<S: Storage>(layer: &Layer, inputs: &Matrix<S>, z: &mut Matrix, a: &mut Matrix) {
    let biases = layer.biases().as_slice();
    for c in 0..inputs.columns() {
        let zc = z.column_mut(c);
        zc.copy_from_slice(biases);
        for (feature, &x) in inputs.column(c).iter().enumerate() {
            for (zr, &w) in zc.iter_mut().zip(layer.weights().column(feature)) {
                *zr += w * x;
            }
        }
    }
    for (av, &zv) in a.as_mut_slice().iter_mut().zip(z.as_slice()) {
        *av = sigmoid(zv);
    }
}

fn compute_gradients<S: Storage>(scratch: &mut LayerScratch, inputs: &Matrix<S>) {
    let LayerScratch { z, a, wgrad, bgrad } = scratch;

    // delta = error * sigmoid'(z), in place
    for (d, &zv) in a.as_mut_slice().iter_mut().zip(z.as_slice()) {
        *d *= sigmoid_prime(zv);
    }

    bgrad.zero();
    wgrad.zero();
    for c in 0..a.columns() {
        let delta = a.column(c);
        for (b, d) in bgrad.column_mut(0).iter_mut().zip(delta) {
            *b += d;
        }
        // wgrad += delta . T(inputs)
        for (feature, &x) in inputs.column(c).iter().enumerate() {
            for (g, d) in wgrad.column_mut(feature).iter_mut().zip(delta) {
                *g += d * x;
            }
        }
    }
}

fn propagate_error(layer: &Layer, delta: &Matrix, previous: &mut Matrix) {
    // previous = T(W) . delta
    for c in 0..delta.columns() {
        let d = delta.column(c);
        let out = previous.column_mut(c);
        for (feature, value) in out.iter_mut().enumerate() {
            *value = layer
                .weights()
                .column(feature)
                .iter()
                .zip(d)
                .map(|(w, e)| w * e)
                .sum();
        }
    }
}
