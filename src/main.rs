use std::sync::mpsc;
use std::thread;

use ferrite_perceptron::{train_loop, Matrix, NeuralNetwork, Result, Topology, TrainConfig, TrainingSamples};
use tracing_subscriber::EnvFilter;

// Four XOR samples, one column each.
const INPUTS: [f64; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];
const EXPECTED: [f64; 4] = [0.0, 1.0, 1.0, 0.0];

// Layer weights (row-major), then layer biases.
const PARAMETERS: [f64; 9] = [1.0, -1.2, -0.9, 1.1, 1.3, 1.2, 0.1, -0.2, -0.3];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let epochs = std::env::args().nth(1).and_then(|arg| arg.parse().ok()).unwrap_or(500);
    if let Err(err) = run(epochs) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(epochs: usize) -> Result<()> {
    let mut network = NeuralNetwork::from_parameters(Topology::new(vec![2, 2, 1])?, &PARAMETERS)?;
    let mut samples = TrainingSamples::new(4, Matrix::wrap(2, 4, &INPUTS[..])?)
        .with_expected_outputs(Matrix::wrap(1, 4, &EXPECTED[..])?)?;

    let (tx, rx) = mpsc::channel();
    let mut config = TrainConfig::new(epochs, 4.0);
    config.progress_tx = Some(tx);

    let loss = thread::scope(|scope| {
        let worker = scope.spawn(move || train_loop(&mut network, &mut samples, &config));
        // Stats are printed as one JSON object per line.
        for stats in rx {
            match serde_json::to_string(&stats) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("error: {err}"),
            }
        }
        worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })?;

    tracing::info!(loss, "training finished");
    Ok(())
}
