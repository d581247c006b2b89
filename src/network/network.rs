use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::loss::mse::MseLoss;
use crate::math::matrix::Matrix;
use crate::network::topology::Topology;
use crate::optim::sgd::Sgd;
use crate::train::context::TrainingContext;
use crate::train::samples::TrainingSamples;

/// A feed-forward network of fully-connected sigmoid layers.
///
/// Owns its parameters and a [`TrainingContext`] of scratch buffers, so a network
/// must not be shared between threads issuing concurrent calls.
#[derive(Debug)]
pub struct NeuralNetwork {
    topology: Topology,
    layers: Vec<Layer>,
    context: TrainingContext,
}

impl NeuralNetwork {
    /// Randomly initialized network using the thread-local RNG.
    pub fn new(topology: Topology) -> Result<NeuralNetwork> {
        NeuralNetwork::with_rng(topology, &mut rand::thread_rng())
    }

    /// Randomly initialized network with a reproducible seed.
    pub fn with_seed(topology: Topology, seed: u64) -> Result<NeuralNetwork> {
        NeuralNetwork::with_rng(topology, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Result<NeuralNetwork> {
        let layers = (0..topology.layers())
            .map(|layer| Layer::xavier(topology.neurons_of(layer), topology.features_of(layer), rng))
            .collect::<Result<Vec<_>>>()?;
        NeuralNetwork::assemble(topology, layers)
    }

    /// Builds a network from explicit layers; each layer's features must equal the
    /// previous layer's neurons.
    pub fn from_layers(layers: Vec<Layer>) -> Result<NeuralNetwork> {
        let mut sizes = Vec::with_capacity(layers.len() + 1);
        if let Some(first) = layers.first() {
            sizes.push(first.features());
        }
        for layer in &layers {
            let previous = sizes[sizes.len() - 1];
            if layer.features() != previous {
                return Err(Error::DimensionMismatch {
                    what: "layer features",
                    expected: previous,
                    actual: layer.features(),
                });
            }
            sizes.push(layer.neurons());
        }
        NeuralNetwork::assemble(Topology::new(sizes)?, layers)
    }

    /// Builds a network from a flat parameter region: every layer's weights
    /// (row-major `neurons × features`), then every layer's biases.
    pub fn from_parameters(topology: Topology, parameters: &[f64]) -> Result<NeuralNetwork> {
        let expected = topology.weight_count() + topology.bias_count();
        if parameters.len() != expected {
            return Err(Error::DimensionMismatch {
                what: "network parameters",
                expected,
                actual: parameters.len(),
            });
        }
        let (mut weights, mut biases) = parameters.split_at(topology.weight_count());
        let mut layers = Vec::with_capacity(topology.layers());
        for layer in 0..topology.layers() {
            let neurons = topology.neurons_of(layer);
            let features = topology.features_of(layer);
            let (w, rest_w) = weights.split_at(neurons * features);
            let (b, rest_b) = biases.split_at(neurons);
            layers.push(Layer::from_parameters(neurons, features, w, b)?);
            weights = rest_w;
            biases = rest_b;
        }
        NeuralNetwork::assemble(topology, layers)
    }

    fn assemble(topology: Topology, layers: Vec<Layer>) -> Result<NeuralNetwork> {
        let context = TrainingContext::new(&layers)?;
        Ok(NeuralNetwork { topology, layers, context })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn layers(&self) -> usize {
        self.topology.layers()
    }

    pub fn features(&self) -> usize {
        self.topology.features()
    }

    pub fn outputs(&self) -> usize {
        self.topology.outputs()
    }

    pub fn features_of(&self, layer: usize) -> usize {
        self.topology.features_of(layer)
    }

    pub fn neurons_of(&self, layer: usize) -> usize {
        self.topology.neurons_of(layer)
    }

    pub fn layer(&self, layer: usize) -> &Layer {
        &self.layers[layer]
    }

    pub fn weight(&self, layer: usize, neuron: usize, feature: usize) -> f64 {
        self.layers[layer].weight(neuron, feature)
    }

    pub fn bias(&self, layer: usize, neuron: usize) -> f64 {
        self.layers[layer].bias(neuron)
    }

    /// The flat parameter region accepted by [`NeuralNetwork::from_parameters`].
    pub fn snapshot(&self) -> Vec<f64> {
        let mut res = Vec::with_capacity(self.topology.weight_count() + self.topology.bias_count());
        for layer in &self.layers {
            layer.write_weights(&mut res);
        }
        for layer in &self.layers {
            layer.write_biases(&mut res);
        }
        res
    }

    /// Widest batch the scratch buffers have been grown to.
    pub fn context_capacity(&self) -> usize {
        self.context.capacity()
    }

    /// Writes the predicted class of every sample into `outputs` at its global index.
    pub fn propagate(&mut self, samples: &mut TrainingSamples<'_>, outputs: &mut [usize]) -> Result<()> {
        self.check_features(samples)?;
        check_outputs_len(samples, outputs.len())?;
        let res = self.for_each_batch(samples, |network, samples, offset, width| {
            let output = network.context.output();
            for c in 0..width {
                outputs[offset + c] = output.max_row_index(c);
            }
            Ok(())
        });
        samples.rewind();
        res
    }

    /// Scores predictions against the expected indices and returns the fraction of
    /// matched samples. Predictions are also written to `outputs` when given.
    pub fn evaluate(
        &mut self,
        samples: &mut TrainingSamples<'_>,
        mut outputs: Option<&mut [usize]>,
    ) -> Result<f64> {
        self.check_features(samples)?;
        self.check_expectations(samples)?;
        if let Some(outputs) = outputs.as_deref() {
            check_outputs_len(samples, outputs.len())?;
        }
        let mut matched = 0usize;
        let res = self.for_each_batch(samples, |network, samples, offset, width| {
            let output = network.context.output();
            for c in 0..width {
                let index = output.max_row_index(c);
                if samples.expected_index(c) == Some(index) {
                    matched += 1;
                }
                if let Some(outputs) = outputs.as_deref_mut() {
                    outputs[offset + c] = index;
                }
            }
            Ok(())
        });
        samples.rewind();
        res?;
        if samples.size() == 0 {
            return Ok(0.0);
        }
        Ok(matched as f64 / samples.size() as f64)
    }

    /// Runs one epoch of mini-batch gradient descent over `samples`.
    pub fn train(&mut self, samples: &mut TrainingSamples<'_>, learning_rate: f64) -> Result<()> {
        self.check_features(samples)?;
        self.check_expectations(samples)?;
        let optimizer = Sgd::new(learning_rate);
        let res = self.for_each_batch(samples, |network, samples, _, _| {
            network.context.cost_derivative(samples)?;
            network.context.backward_all(&network.layers, samples.inputs());
            network.context.update_network(&mut network.layers, &optimizer);
            Ok(())
        });
        samples.rewind();
        res
    }

    /// Final-layer activations for every sample, `outputs × size`.
    pub fn predict_outputs(&mut self, samples: &mut TrainingSamples<'_>) -> Result<Matrix> {
        self.check_features(samples)?;
        let mut res = Matrix::try_zeros(self.outputs(), samples.size())?;
        let result = self.for_each_batch(samples, |network, _, offset, width| {
            let output = network.context.output();
            res.slide(offset, width);
            res.as_mut_slice().copy_from_slice(output.as_slice());
            Ok(())
        });
        samples.rewind();
        result?;
        res.slide(0, samples.size());
        Ok(res)
    }

    /// Mean over samples of the per-sample MSE against the expected outputs (or
    /// the one-hot of the expected indices).
    pub fn mean_squared_error(&mut self, samples: &mut TrainingSamples<'_>) -> Result<f64> {
        self.check_features(samples)?;
        self.check_expectations(samples)?;
        let mut total = 0.0;
        let res = self.for_each_batch(samples, |network, samples, _, width| {
            let output = network.context.output();
            for c in 0..width {
                total += match samples.expected_outputs() {
                    Some(expected) => MseLoss::loss(output.column(c), expected.column(c)),
                    None => {
                        let index = samples.expected_index(c).ok_or(Error::MissingExpectations)?;
                        MseLoss::loss_one_hot(output.column(c), index)
                    }
                };
            }
            Ok(())
        });
        samples.rewind();
        res?;
        if samples.size() == 0 {
            return Ok(0.0);
        }
        Ok(total / samples.size() as f64)
    }

    /// Slides `samples` batch by batch from offset 0, runs the forward pass and
    /// hands each batch to `f` as `(network, samples, offset, width)`.
    fn for_each_batch<F>(&mut self, samples: &mut TrainingSamples<'_>, mut f: F) -> Result<()>
    where
        F: FnMut(&mut NeuralNetwork, &TrainingSamples<'_>, usize, usize) -> Result<()>,
    {
        let size = samples.size();
        let batch_size = samples.batch_size();
        let mut offset = 0;
        while offset < size {
            let width = samples.slide(offset, batch_size);
            if width == 0 {
                break;
            }
            trace!(offset, width, "batch");
            self.context.forward(&self.layers, samples.inputs())?;
            f(self, samples, offset, width)?;
            offset += width;
        }
        Ok(())
    }

    fn check_features(&self, samples: &TrainingSamples<'_>) -> Result<()> {
        if samples.features() != self.features() {
            return Err(Error::DimensionMismatch {
                what: "samples features",
                expected: self.features(),
                actual: samples.features(),
            });
        }
        Ok(())
    }

    /// Ground truth must exist and fit the output layer: expected outputs need one
    /// row per output and every expected index must name an output.
    fn check_expectations(&self, samples: &TrainingSamples<'_>) -> Result<()> {
        if !samples.has_expectations() {
            return Err(Error::MissingExpectations);
        }
        if let Some(outputs) = samples.outputs() {
            if outputs != self.outputs() {
                return Err(Error::DimensionMismatch {
                    what: "samples outputs",
                    expected: self.outputs(),
                    actual: outputs,
                });
            }
        }
        let mut indices = samples.expected_indices().into_iter().flatten();
        if let Some(&index) = indices.find(|&&index| index >= self.outputs()) {
            return Err(Error::DimensionMismatch {
                what: "expected index",
                expected: self.outputs(),
                actual: index,
            });
        }
        Ok(())
    }
}

fn check_outputs_len(samples: &TrainingSamples<'_>, len: usize) -> Result<()> {
    if len < samples.size() {
        return Err(Error::DimensionMismatch {
            what: "outputs length",
            expected: samples.size(),
            actual: len,
        });
    }
    Ok(())
}
