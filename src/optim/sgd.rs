use crate::{layers::dense::Layer, math::matrix::{Matrix, Storage}};

/// Plain mini-batch gradient descent.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one update to a layer given gradients summed over `samples` columns.
    ///
    /// Both weights and biases move by `learning_rate / samples` times their gradient.
    pub fn step<W: Storage, B: Storage>(
        &self,
        layer: &mut Layer,
        weights_grad: &Matrix<W>,
        biases_grad: &Matrix<B>,
        samples: usize,
    ) {
        if samples == 0 {
            return;
        }
        layer.apply_gradients(weights_grad, biases_grad, self.learning_rate / samples as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_scales_by_batch_width() {
        let mut layer = Layer::from_parameters(1, 1, &[1.0], &[1.0]).unwrap();
        let wgrad = Matrix::from_data(vec![vec![4.0]]);
        let bgrad = Matrix::from_data(vec![vec![2.0]]);
        Sgd::new(0.5).step(&mut layer, &wgrad, &bgrad, 4);
        assert_eq!(layer.weight(0, 0), 0.5);
        assert_eq!(layer.bias(0), 0.75);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut layer = Layer::from_parameters(1, 1, &[1.0], &[1.0]).unwrap();
        let grad = Matrix::from_data(vec![vec![4.0]]);
        Sgd::new(0.5).step(&mut layer, &grad, &grad, 0);
        assert_eq!(layer.weight(0, 0), 1.0);
    }
}
