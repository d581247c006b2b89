pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>() / n
    }

    /// Same as `loss` against the one-hot vector of `index`, without materializing it.
    pub fn loss_one_hot(predicted: &[f64], index: usize) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().enumerate()
            .map(|(i, a)| if i == index { (a - 1.0).powi(2) } else { a.powi(2) })
            .sum::<f64>() / n
    }
}
