use ferrite_perceptron::{Error, Matrix, NeuralNetwork, Topology, TrainingSamples};

const N: usize = 12;

// Neuron i only looks at feature i, so the predicted class is the arg-max input.
fn argmax_network() -> NeuralNetwork {
    let topology = Topology::new(vec![3, 3]).unwrap();
    let mut parameters = vec![0.0; 12];
    for i in 0..3 {
        parameters[i * 3 + i] = 5.0;
    }
    NeuralNetwork::from_parameters(topology, &parameters).unwrap()
}

fn dataset() -> (Matrix, Vec<usize>) {
    let columns: Vec<Vec<f64>> = (0..N)
        .map(|s| (0..3).map(|f| if f == s % 3 { 1.0 } else { 0.1 * f as f64 }).collect())
        .collect();
    let labels = (0..N).map(|s| s % 3).collect();
    (Matrix::from_data(columns), labels)
}

#[test]
fn perfect_predictions_score_one() {
    let mut network = argmax_network();
    let (inputs, labels) = dataset();
    let mut samples = TrainingSamples::new(5, inputs.view()).with_expected_indices(&labels).unwrap();
    let mut outputs = vec![usize::MAX; N];

    assert_eq!(network.evaluate(&mut samples, Some(&mut outputs)).unwrap(), 1.0);
    assert_eq!(outputs, labels);
}

#[test]
fn wrong_labels_lower_accuracy() {
    let mut network = argmax_network();
    let (inputs, mut labels) = dataset();
    let wrong = 4;
    for label in labels.iter_mut().take(wrong) {
        *label = (*label + 1) % 3;
    }
    let mut samples = TrainingSamples::new(0, inputs.view()).with_expected_indices(&labels).unwrap();

    let accuracy = network.evaluate(&mut samples, None).unwrap();
    assert_eq!(accuracy, (N - wrong) as f64 / N as f64);
}

#[test]
fn expected_outputs_stand_in_for_indices() {
    let mut network = argmax_network();
    let (inputs, labels) = dataset();
    let one_hot = Matrix::from_data(
        labels.iter().map(|&l| (0..3).map(|o| if o == l { 1.0 } else { 0.0 }).collect()).collect(),
    );
    let mut samples = TrainingSamples::new(4, inputs.view()).with_expected_outputs(one_hot.view()).unwrap();

    assert_eq!(network.evaluate(&mut samples, None).unwrap(), 1.0);
}

#[test]
fn evaluate_requires_expectations() {
    let mut network = argmax_network();
    let (inputs, _) = dataset();
    let mut samples = TrainingSamples::new(4, inputs.view());

    assert_eq!(network.evaluate(&mut samples, None), Err(Error::MissingExpectations));
}

#[test]
fn empty_dataset_scores_zero() {
    let mut network = argmax_network();
    let inputs = Matrix::zeros(3, 0);
    let labels: [usize; 0] = [];
    let mut samples = TrainingSamples::new(4, inputs.view()).with_expected_indices(&labels).unwrap();

    assert_eq!(network.evaluate(&mut samples, None).unwrap(), 0.0);
}
