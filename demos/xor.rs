use ferrite_perceptron::host::codec;
use ferrite_perceptron::{Matrix, Registry};

fn main() -> ferrite_perceptron::Result<()> {
    let mut registry = Registry::new();

    // [layers][sizes...][weights row-major...][biases...]
    let mut network = Vec::new();
    for value in [2i32, 2, 2, 1] {
        network.extend_from_slice(&value.to_le_bytes());
    }
    for value in [1.0f64, -1.2, -0.9, 1.1, 1.3, 1.2, 0.1, -0.2, -0.3] {
        network.extend_from_slice(&value.to_le_bytes());
    }
    let network = registry.create_network(&network)?;

    let inputs = Matrix::from_data(vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]);
    let expected = Matrix::from_data(vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]]);
    let samples = registry.create_samples(
        4,
        &codec::encode_matrix(&inputs)?,
        Some(&codec::encode_matrix(&expected)?),
        None,
    )?;

    let mut predictions = [0i32; 4];
    for epoch in 0..500 {
        registry.train(network, samples, 4.0)?;
        if epoch % 100 == 0 {
            let accuracy = registry.evaluate(network, samples, Some(&mut predictions))?;
            println!("Epoch {epoch}: accuracy = {accuracy:.2}");
        }
    }

    // A single output neuron always predicts class 0, so print the raw activations.
    let mut view = registry.sample_set(samples)?.samples()?;
    let mut copy = codec::decode_network(&registry.export_network(network)?, &mut rand::thread_rng())?;
    let outputs = copy.predict_outputs(&mut view)?;
    for c in 0..inputs.columns() {
        println!("Input: {:?} -> Output: {:.4}", inputs.column(c), outputs.get(0, c));
    }

    registry.delete_samples(samples);
    registry.delete_network(network);
    Ok(())
}
