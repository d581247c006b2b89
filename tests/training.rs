use std::sync::mpsc;

use ferrite_perceptron::{
    train_loop, EpochStats, Matrix, NeuralNetwork, Topology, TrainConfig, TrainingSamples,
};

const XOR_INPUTS: [f64; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];
const XOR_EXPECTED: [f64; 4] = [0.0, 1.0, 1.0, 0.0];
const XOR_PARAMETERS: [f64; 9] = [1.0, -1.2, -0.9, 1.1, 1.3, 1.2, 0.1, -0.2, -0.3];

fn xor_network() -> NeuralNetwork {
    NeuralNetwork::from_parameters(Topology::new(vec![2, 2, 1]).unwrap(), &XOR_PARAMETERS).unwrap()
}

#[test]
fn xor_converges_with_full_batches() {
    let mut network = xor_network();
    let mut samples = TrainingSamples::new(4, Matrix::wrap(2, 4, &XOR_INPUTS[..]).unwrap())
        .with_expected_outputs(Matrix::wrap(1, 4, &XOR_EXPECTED[..]).unwrap())
        .unwrap();
    let initial = network.mean_squared_error(&mut samples).unwrap();

    let (tx, rx) = mpsc::channel();
    let mut config = TrainConfig::new(500, 4.0);
    config.progress_tx = Some(tx);
    let loss = train_loop(&mut network, &mut samples, &config).unwrap();
    drop(config);
    let stats: Vec<EpochStats> = rx.iter().collect();

    assert_eq!(stats.len(), 500);
    assert!(stats[0].train_loss < initial);
    assert!(stats.windows(2).all(|w| w[1].train_loss < w[0].train_loss));
    assert!(loss < 0.01, "loss {loss}");

    let outputs = network.predict_outputs(&mut samples).unwrap();
    for (c, &expected) in XOR_EXPECTED.iter().enumerate() {
        assert!((outputs.get(0, c) - expected).abs() < 0.2);
    }
}

#[test]
fn zero_batch_size_is_one_full_batch() {
    let inputs = Matrix::wrap(2, 4, &XOR_INPUTS[..]).unwrap();
    let expected = Matrix::wrap(1, 4, &XOR_EXPECTED[..]).unwrap();

    let mut whole = xor_network();
    let mut explicit = xor_network();
    let mut per_sample = xor_network();
    for _ in 0..10 {
        let mut samples = TrainingSamples::new(0, inputs.clone()).with_expected_outputs(expected.clone()).unwrap();
        whole.train(&mut samples, 1.0).unwrap();
        let mut samples = TrainingSamples::new(4, inputs.clone()).with_expected_outputs(expected.clone()).unwrap();
        explicit.train(&mut samples, 1.0).unwrap();
        let mut samples = TrainingSamples::new(1, inputs.clone()).with_expected_outputs(expected.clone()).unwrap();
        per_sample.train(&mut samples, 1.0).unwrap();
    }

    assert_eq!(whole.snapshot(), explicit.snapshot());
    assert_ne!(whole.snapshot(), per_sample.snapshot());
}

#[test]
fn batch_size_does_not_change_predictions() {
    let mut network = NeuralNetwork::with_seed(Topology::new(vec![3, 5, 4]).unwrap(), 11).unwrap();
    let data: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64 / 11.0 - 0.5).collect();

    let mut reference = vec![0; 10];
    let mut samples = TrainingSamples::new(0, Matrix::wrap(3, 10, &data[..]).unwrap());
    network.propagate(&mut samples, &mut reference).unwrap();

    for batch_size in [1, 3, 4, 10, 25] {
        let mut outputs = vec![usize::MAX; 10];
        let mut samples = TrainingSamples::new(batch_size, Matrix::wrap(3, 10, &data[..]).unwrap());
        network.propagate(&mut samples, &mut outputs).unwrap();
        assert_eq!(outputs, reference, "batch size {batch_size}");
        assert_eq!(samples.offset(), 0);
    }
    assert_eq!(network.context_capacity(), 10);
}

#[test]
fn expected_indices_train_like_one_hot_outputs() {
    let inputs = Matrix::from_data(vec![vec![0.1, 0.9], vec![0.8, 0.3], vec![0.5, 0.5]]);
    let one_hot = Matrix::from_data(vec![vec![0.0, 1.0, 0.0], vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]);
    let indices = [1, 0, 2];

    let mut by_outputs = NeuralNetwork::with_seed(Topology::new(vec![2, 4, 3]).unwrap(), 5).unwrap();
    let mut by_indices = NeuralNetwork::from_parameters(by_outputs.topology().clone(), &by_outputs.snapshot()).unwrap();

    let mut samples = TrainingSamples::new(2, inputs.view()).with_expected_outputs(one_hot.view()).unwrap();
    by_outputs.train(&mut samples, 0.7).unwrap();
    let mut samples = TrainingSamples::new(2, inputs.view()).with_expected_indices(&indices).unwrap();
    by_indices.train(&mut samples, 0.7).unwrap();

    assert_eq!(by_outputs.snapshot(), by_indices.snapshot());
}
