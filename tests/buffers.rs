use ferrite_perceptron::host::codec;
use ferrite_perceptron::{Matrix, NeuralNetwork, Registry, Topology, TrainingSamples};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn inputs() -> Matrix {
    Matrix::from_data((0..7).map(|s| vec![s as f64 / 7.0, 1.0 - s as f64 / 5.0, 0.25]).collect())
}

#[test]
fn network_buffer_round_trip_predicts_identically() {
    let mut original = NeuralNetwork::with_seed(Topology::new(vec![3, 6, 2]).unwrap(), 21).unwrap();
    let bytes = codec::encode_network(&original).unwrap();
    let mut copy = codec::decode_network(&bytes, &mut StdRng::seed_from_u64(0)).unwrap();

    let inputs = inputs();
    let a = original.predict_outputs(&mut TrainingSamples::new(3, inputs.view())).unwrap();
    let b = copy.predict_outputs(&mut TrainingSamples::new(2, inputs.view())).unwrap();
    assert_eq!(a.as_slice(), b.as_slice());
}

#[test]
fn topology_only_buffer_is_seeded() {
    let bytes: Vec<u8> = [2i32, 3, 4, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
    let a = codec::decode_network(&bytes, &mut StdRng::seed_from_u64(9)).unwrap();
    let b = codec::decode_network(&bytes, &mut StdRng::seed_from_u64(9)).unwrap();
    assert_eq!(a.topology().sizes(), &[3, 4, 2]);
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn registry_matches_direct_calls() {
    let network = NeuralNetwork::with_seed(Topology::new(vec![3, 4, 2]).unwrap(), 2).unwrap();
    let mut direct = NeuralNetwork::from_parameters(network.topology().clone(), &network.snapshot()).unwrap();
    let inputs = inputs();
    let labels = [0usize, 1, 1, 0, 1, 0, 0];

    let mut registry = Registry::new();
    let net = registry.insert_network(network);
    let samples = registry
        .create_samples(
            3,
            &codec::encode_matrix(&inputs).unwrap(),
            None,
            Some(&codec::encode_indices(&labels).unwrap()),
        )
        .unwrap();

    let mut view = TrainingSamples::new(3, inputs.view()).with_expected_indices(&labels).unwrap();
    for _ in 0..5 {
        registry.train(net, samples, 0.5).unwrap();
        direct.train(&mut view, 0.5).unwrap();
    }
    assert_eq!(registry.network(net).unwrap().snapshot(), direct.snapshot());

    let mut expected = vec![0usize; 7];
    let accuracy = direct.evaluate(&mut view, Some(&mut expected)).unwrap();
    let mut predicted = [0i32; 7];
    assert_eq!(registry.evaluate(net, samples, Some(&mut predicted)).unwrap(), accuracy);
    assert_eq!(predicted.iter().map(|&p| p as usize).collect::<Vec<_>>(), expected);

    let batch = codec::encode_batch::<_, Vec<f64>>(&inputs, None).unwrap();
    let mut from_batch = [0i32; 7];
    registry.propagate_batch(net, &batch, &mut from_batch).unwrap();
    assert_eq!(from_batch, predicted);
}
