pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod host;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::{Matrix, MatrixView, MatrixViewMut};
pub use layers::dense::Layer;
pub use network::network::NeuralNetwork;
pub use network::topology::Topology;
pub use loss::mse::MseLoss;
pub use optim::sgd::Sgd;
pub use train::{train_loop, EpochStats, TrainConfig, TrainingContext, TrainingSamples};
pub use host::registry::{NetworkHandle, Registry, SamplesHandle};
