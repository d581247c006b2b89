use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::host::codec::{self, Batch};
use crate::math::matrix::Matrix;
use crate::network::network::NeuralNetwork;
use crate::train::samples::TrainingSamples;

/// Opaque reference to a network owned by a [`Registry`]. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkHandle(u64);

/// Opaque reference to a sample set owned by a [`Registry`]. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplesHandle(u64);

impl NetworkHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl SamplesHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A decoded dataset kept alive by the registry.
#[derive(Debug, Clone)]
pub struct SampleSet {
    batch_size: usize,
    inputs: Matrix,
    expected_outputs: Option<Matrix>,
    expected_indices: Option<Vec<usize>>,
}

impl SampleSet {
    pub fn size(&self) -> usize {
        self.inputs.capacity()
    }

    pub fn batch_size(&self) -> usize {
        if self.batch_size == 0 { self.size() } else { self.batch_size }
    }

    /// Borrowing view with a fresh cursor.
    pub fn samples(&self) -> Result<TrainingSamples<'_>> {
        let mut samples = TrainingSamples::new(self.batch_size, self.inputs.view());
        if let Some(expected) = &self.expected_outputs {
            samples = samples.with_expected_outputs(expected.view())?;
        }
        if let Some(indices) = &self.expected_indices {
            samples = samples.with_expected_indices(indices)?;
        }
        Ok(samples)
    }
}

/// Owns networks and sample sets on behalf of a host, addressed by handles.
///
/// Each registry is independent; a host that serves several workers keeps one
/// registry (or at least one network) per worker.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: u64,
    networks: HashMap<u64, NeuralNetwork>,
    samples: HashMap<u64, SampleSet>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Decodes a network buffer; a topology-only buffer gets random weights.
    pub fn create_network(&mut self, buffer: &[u8]) -> Result<NetworkHandle> {
        let network = codec::decode_network(buffer, &mut rand::thread_rng())?;
        Ok(self.insert_network(network))
    }

    /// Takes ownership of an already built network.
    pub fn insert_network(&mut self, network: NeuralNetwork) -> NetworkHandle {
        let id = self.allocate_id();
        debug!(id, sizes = ?network.topology().sizes(), "network created");
        self.networks.insert(id, network);
        NetworkHandle(id)
    }

    /// Returns `true` if the handle referred to a live network.
    pub fn delete_network(&mut self, handle: NetworkHandle) -> bool {
        self.networks.remove(&handle.0).is_some()
    }

    pub fn network(&self, handle: NetworkHandle) -> Result<&NeuralNetwork> {
        self.networks.get(&handle.0).ok_or_else(|| unknown(handle.0))
    }

    fn network_mut(&mut self, handle: NetworkHandle) -> Result<&mut NeuralNetwork> {
        self.networks.get_mut(&handle.0).ok_or_else(|| unknown(handle.0))
    }

    /// Decodes matrix buffers into a sample set. Expected outputs and indices are
    /// each optional; a `batch_size` of 0 means one batch for the whole set.
    pub fn create_samples(
        &mut self,
        batch_size: usize,
        inputs: &[u8],
        expected_outputs: Option<&[u8]>,
        expected_indices: Option<&[u8]>,
    ) -> Result<SamplesHandle> {
        let set = SampleSet {
            batch_size,
            inputs: codec::decode_matrix(inputs)?,
            expected_outputs: expected_outputs.map(codec::decode_matrix).transpose()?,
            expected_indices: expected_indices.map(codec::decode_indices).transpose()?,
        };
        // validates co-indexing before a handle is handed out
        set.samples()?;
        let id = self.allocate_id();
        debug!(id, size = set.size(), batch_size = set.batch_size(), "samples created");
        self.samples.insert(id, set);
        Ok(SamplesHandle(id))
    }

    pub fn delete_samples(&mut self, handle: SamplesHandle) -> bool {
        self.samples.remove(&handle.0).is_some()
    }

    pub fn sample_set(&self, handle: SamplesHandle) -> Result<&SampleSet> {
        self.samples.get(&handle.0).ok_or_else(|| unknown(handle.0))
    }

    pub fn size(&self, handle: SamplesHandle) -> Result<usize> {
        Ok(self.sample_set(handle)?.size())
    }

    pub fn batch_size(&self, handle: SamplesHandle) -> Result<usize> {
        Ok(self.sample_set(handle)?.batch_size())
    }

    pub fn layers(&self, handle: NetworkHandle) -> Result<usize> {
        Ok(self.network(handle)?.layers())
    }

    pub fn features(&self, handle: NetworkHandle) -> Result<usize> {
        Ok(self.network(handle)?.features())
    }

    pub fn neurons(&self, handle: NetworkHandle, layer: usize) -> Result<usize> {
        let network = self.network(handle)?;
        if layer >= network.layers() {
            return Err(Error::DimensionMismatch {
                what: "layer index bound",
                expected: network.layers(),
                actual: layer,
            });
        }
        Ok(network.neurons_of(layer))
    }

    pub fn outputs(&self, handle: NetworkHandle) -> Result<usize> {
        Ok(self.network(handle)?.outputs())
    }

    /// Trains one epoch over a registered sample set.
    pub fn train(&mut self, network: NetworkHandle, samples: SamplesHandle, learning_rate: f64) -> Result<()> {
        let set = self.samples.get(&samples.0).ok_or_else(|| unknown(samples.0))?;
        let network = self.networks.get_mut(&network.0).ok_or_else(|| unknown(network.0))?;
        network.train(&mut set.samples()?, learning_rate)
    }

    pub fn propagate(&mut self, network: NetworkHandle, samples: SamplesHandle, outputs: &mut [i32]) -> Result<()> {
        let set = self.samples.get(&samples.0).ok_or_else(|| unknown(samples.0))?;
        let network = self.networks.get_mut(&network.0).ok_or_else(|| unknown(network.0))?;
        let mut indices = vec![0; set.size()];
        network.propagate(&mut set.samples()?, &mut indices)?;
        write_indices(&indices, outputs)
    }

    pub fn evaluate(
        &mut self,
        network: NetworkHandle,
        samples: SamplesHandle,
        outputs: Option<&mut [i32]>,
    ) -> Result<f64> {
        let set = self.samples.get(&samples.0).ok_or_else(|| unknown(samples.0))?;
        let network = self.networks.get_mut(&network.0).ok_or_else(|| unknown(network.0))?;
        let mut indices = vec![0; set.size()];
        let accuracy = network.evaluate(&mut set.samples()?, Some(&mut indices))?;
        if let Some(outputs) = outputs {
            write_indices(&indices, outputs)?;
        }
        Ok(accuracy)
    }

    /// Trains on a self-contained batch buffer, processed as a single batch.
    pub fn train_batch(&mut self, handle: NetworkHandle, batch: &[u8], learning_rate: f64) -> Result<()> {
        let network = self.network_mut(handle)?;
        let Batch { inputs, expected_outputs } =
            codec::decode_batch(batch, network.features(), network.outputs())?;
        let expected = expected_outputs.ok_or(Error::MissingExpectations)?;
        let mut samples = TrainingSamples::new(0, inputs.view()).with_expected_outputs(expected.view())?;
        network.train(&mut samples, learning_rate)
    }

    /// Predicts the class of every sample of a batch buffer.
    pub fn propagate_batch(&mut self, handle: NetworkHandle, batch: &[u8], outputs: &mut [i32]) -> Result<()> {
        let network = self.network_mut(handle)?;
        let Batch { inputs, .. } = codec::decode_batch(batch, network.features(), network.outputs())?;
        let mut samples = TrainingSamples::new(0, inputs.view());
        let mut indices = vec![0; samples.size()];
        network.propagate(&mut samples, &mut indices)?;
        write_indices(&indices, outputs)
    }

    /// Re-encodes a network, parameters included.
    pub fn export_network(&self, handle: NetworkHandle) -> Result<Vec<u8>> {
        codec::encode_network(self.network(handle)?)
    }
}

fn unknown(id: u64) -> Error {
    warn!(id, "unknown handle");
    Error::UnknownHandle(id)
}

fn write_indices(indices: &[usize], outputs: &mut [i32]) -> Result<()> {
    if outputs.len() < indices.len() {
        return Err(Error::DimensionMismatch {
            what: "outputs length",
            expected: indices.len(),
            actual: outputs.len(),
        });
    }
    for (out, &index) in outputs.iter_mut().zip(indices) {
        *out = i32::try_from(index)
            .map_err(|_| Error::MalformedBuffer(format!("class index {index} does not fit an i32")))?;
    }
    Ok(())
}
