pub mod context;
pub mod epoch_stats;
pub mod loop_fn;
pub mod samples;
pub mod train_config;

pub use context::TrainingContext;
pub use epoch_stats::EpochStats;
pub use loop_fn::train_loop;
pub use samples::TrainingSamples;
pub use train_config::TrainConfig;
