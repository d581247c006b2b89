use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ferrite_perceptron::{Matrix, NeuralNetwork, Topology, TrainingSamples};

const SAMPLES: usize = 256;

fn dataset() -> (Matrix, Matrix) {
    let inputs = Matrix::from_data((0..SAMPLES).map(|s| vec![(s % 7) as f64 / 7.0; 64]).collect());
    let expected = Matrix::from_data(
        (0..SAMPLES)
            .map(|s| (0..10).map(|o| if o == s % 10 { 1.0 } else { 0.0 }).collect())
            .collect(),
    );
    (inputs, expected)
}

fn propagate_bench(c: &mut Criterion) {
    let mut network = NeuralNetwork::with_seed(Topology::new(vec![64, 128, 10]).unwrap(), 0).unwrap();
    let (inputs, _) = dataset();
    let mut samples = TrainingSamples::new(32, inputs.view());
    let mut outputs = vec![0; SAMPLES];

    c.bench_function("propagate_64_128_10_x256", |b| {
        b.iter(|| {
            network.propagate(black_box(&mut samples), &mut outputs).unwrap();
            black_box(&outputs);
        })
    });
}

fn train_bench(c: &mut Criterion) {
    let mut network = NeuralNetwork::with_seed(Topology::new(vec![64, 128, 10]).unwrap(), 0).unwrap();
    let (inputs, expected) = dataset();
    let mut samples = TrainingSamples::new(32, inputs.view())
        .with_expected_outputs(expected.view())
        .unwrap();

    c.bench_function("train_epoch_64_128_10_x256", |b| {
        b.iter(|| network.train(black_box(&mut samples), 0.1).unwrap())
    });
}

criterion_group!(benches, propagate_bench, train_bench);
criterion_main!(benches);
