pub mod network;
pub mod topology;

pub use network::NeuralNetwork;
pub use topology::Topology;
