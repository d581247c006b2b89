//! Byte-buffer surface for hosts that hand over raw memory instead of Rust values.

pub mod codec;
pub mod registry;

pub use codec::Batch;
pub use registry::{NetworkHandle, Registry, SampleSet, SamplesHandle};
