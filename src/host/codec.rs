//! Byte layouts exchanged with a host runtime.
//!
//! All integers are little-endian `i32`, all reals little-endian `f64`.
//!
//! - topology: `[layer count][layer count + 1 layer sizes]`
//! - network: topology, then every layer's weights (row-major `neurons × features`),
//!   then every layer's biases. A topology with no parameter region asks for a
//!   randomly initialized network.
//! - matrix: `[rows][columns][rows × columns values]`, one contiguous column per sample
//! - batch: `[sample count][features × samples inputs][outputs × samples expected outputs]`,
//!   column per sample; the expected outputs block is optional
//! - indices: one `i32` per sample, no header

use rand::Rng;

use crate::error::{Error, Result};
use crate::math::matrix::{Matrix, Storage};
use crate::network::network::NeuralNetwork;
use crate::network::topology::Topology;

const INT: usize = std::mem::size_of::<i32>();
const REAL: usize = std::mem::size_of::<f64>();

/// Sequential reader over a host buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::MalformedBuffer(format!(
                "{what}: need {len} bytes, {} remaining",
                self.remaining()
            )));
        }
        let res = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(res)
    }

    pub fn next_i32(&mut self, what: &str) -> Result<i32> {
        let mut buf = [0u8; INT];
        buf.copy_from_slice(self.take(INT, what)?);
        Ok(i32::from_le_bytes(buf))
    }

    /// Reads a non-negative `i32` count.
    pub fn next_count(&mut self, what: &str) -> Result<usize> {
        let value = self.next_i32(what)?;
        usize::try_from(value)
            .map_err(|_| Error::MalformedBuffer(format!("{what}: negative value {value}")))
    }

    pub fn next_f64s(&mut self, count: usize, what: &str) -> Result<Vec<f64>> {
        let len = count
            .checked_mul(REAL)
            .ok_or_else(|| Error::MalformedBuffer(format!("{what}: {count} values overflow")))?;
        let bytes = self.take(len, what)?;
        let mut res = Vec::new();
        res.try_reserve_exact(count)
            .map_err(|_| Error::Allocation { values: count })?;
        res.extend(bytes.chunks_exact(REAL).map(|chunk| {
            let mut buf = [0u8; REAL];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        }));
        Ok(res)
    }

    /// Reads `rows × columns` values into an owned matrix.
    pub fn next_matrix(&mut self, rows: usize, columns: usize, what: &str) -> Result<Matrix> {
        let count = rows
            .checked_mul(columns)
            .ok_or_else(|| Error::MalformedBuffer(format!("{what}: {rows} × {columns} overflows")))?;
        Matrix::wrap(rows, columns, self.next_f64s(count, what)?)
    }
}

fn put_i32(out: &mut Vec<u8>, value: usize) -> Result<()> {
    let value = i32::try_from(value)
        .map_err(|_| Error::MalformedBuffer(format!("{value} does not fit an i32")))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

fn put_f64s(out: &mut Vec<u8>, values: &[f64]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn decode_topology(reader: &mut Reader<'_>) -> Result<Topology> {
    let layers = reader.next_count("layer count")?;
    let count = layers
        .checked_add(1)
        .ok_or_else(|| Error::MalformedBuffer("layer count overflows".to_owned()))?;
    if reader.remaining() / INT < count {
        return Err(Error::MalformedBuffer(format!(
            "layer sizes: need {count} sizes, {} bytes remaining",
            reader.remaining()
        )));
    }
    let sizes = (0..count)
        .map(|_| reader.next_count("layer size"))
        .collect::<Result<Vec<_>>>()?;
    if Topology::parameter_count(&sizes).is_none() {
        return Err(Error::MalformedBuffer(format!("layer sizes {sizes:?}: parameter count overflows")));
    }
    Topology::new(sizes)
}

pub fn encode_topology(topology: &Topology, out: &mut Vec<u8>) -> Result<()> {
    put_i32(out, topology.layers())?;
    for &size in topology.sizes() {
        put_i32(out, size)?;
    }
    Ok(())
}

/// Decodes a network buffer, drawing random weights from `rng` when the buffer
/// only carries a topology.
pub fn decode_network<R: Rng + ?Sized>(bytes: &[u8], rng: &mut R) -> Result<NeuralNetwork> {
    let mut reader = Reader::new(bytes);
    let topology = decode_topology(&mut reader)?;
    if reader.remaining() == 0 {
        return NeuralNetwork::with_rng(topology, rng);
    }
    let count = topology.weight_count() + topology.bias_count();
    let parameters = reader.next_f64s(count, "network parameters")?;
    NeuralNetwork::from_parameters(topology, &parameters)
}

/// Encodes the topology and current parameters; the result decodes to an
/// identical network.
pub fn encode_network(network: &NeuralNetwork) -> Result<Vec<u8>> {
    let snapshot = network.snapshot();
    let mut out = Vec::with_capacity((network.topology().sizes().len() + 1) * INT + snapshot.len() * REAL);
    encode_topology(network.topology(), &mut out)?;
    put_f64s(&mut out, &snapshot);
    Ok(out)
}

pub fn decode_matrix(bytes: &[u8]) -> Result<Matrix> {
    let mut reader = Reader::new(bytes);
    let rows = reader.next_count("matrix rows")?;
    let columns = reader.next_count("matrix columns")?;
    reader.next_matrix(rows, columns, "matrix values")
}

pub fn encode_matrix<S: Storage>(matrix: &Matrix<S>) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 * INT + matrix.as_slice().len() * REAL);
    put_i32(&mut out, matrix.rows())?;
    put_i32(&mut out, matrix.columns())?;
    put_f64s(&mut out, matrix.as_slice());
    Ok(out)
}

/// A decoded batch buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub expected_outputs: Option<Matrix>,
}

/// Decodes a batch buffer for a network with `features` inputs and `outputs` outputs.
pub fn decode_batch(bytes: &[u8], features: usize, outputs: usize) -> Result<Batch> {
    let mut reader = Reader::new(bytes);
    let samples = reader.next_count("sample count")?;
    let inputs = reader.next_matrix(features, samples, "batch inputs")?;
    let expected_outputs = match reader.remaining() {
        0 => None,
        _ => Some(reader.next_matrix(outputs, samples, "batch expected outputs")?),
    };
    if reader.remaining() != 0 {
        return Err(Error::MalformedBuffer(format!(
            "batch: {} trailing bytes",
            reader.remaining()
        )));
    }
    Ok(Batch { inputs, expected_outputs })
}

pub fn encode_batch<S: Storage, T: Storage>(
    inputs: &Matrix<S>,
    expected_outputs: Option<&Matrix<T>>,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    put_i32(&mut out, inputs.columns())?;
    put_f64s(&mut out, inputs.as_slice());
    if let Some(expected) = expected_outputs {
        put_f64s(&mut out, expected.as_slice());
    }
    Ok(out)
}

pub fn decode_indices(bytes: &[u8]) -> Result<Vec<usize>> {
    if bytes.len() % INT != 0 {
        return Err(Error::MalformedBuffer(format!(
            "indices: {} bytes is not a multiple of {INT}",
            bytes.len()
        )));
    }
    let mut reader = Reader::new(bytes);
    (0..bytes.len() / INT)
        .map(|_| reader.next_count("class index"))
        .collect()
}

pub fn encode_indices(indices: &[usize]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(indices.len() * INT);
    for &index in indices {
        put_i32(&mut out, index)?;
    }
    Ok(out)
}
