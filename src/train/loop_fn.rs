use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::network::network::NeuralNetwork;
use crate::train::epoch_stats::EpochStats;
use crate::train::samples::TrainingSamples;
use crate::train::train_config::TrainConfig;

/// Trains `network` for `config.epochs` epochs and returns the mean squared
/// error measured after the **last completed epoch** (`0.0` if none ran).
///
/// Each epoch is one `NeuralNetwork::train` pass over `samples` followed by an
/// evaluation pass for loss and accuracy.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Errors
/// Propagates the first error of a training or evaluation pass, e.g. missing
/// expectations or a feature-count mismatch.
pub fn train_loop(
    network: &mut NeuralNetwork,
    samples: &mut TrainingSamples<'_>,
    config: &TrainConfig,
) -> Result<f64> {
    let mut last_train_loss = 0.0;

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();

        network.train(samples, config.learning_rate)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        let train_loss = network.mean_squared_error(samples)?;
        let train_accuracy = network.evaluate(samples, None)?;
        last_train_loss = train_loss;

        info!(epoch, total = config.epochs, train_loss, train_accuracy, elapsed_ms, "epoch done");

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy,
            elapsed_ms,
        };

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(last_train_loss)
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}
