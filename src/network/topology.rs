use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered layer sizes `L0..Ln`: `L0` is the feature count, `Ln` the output count.
///
/// Layer `i` maps `L[i]` features to `L[i + 1]` neurons, so a topology with
/// `n + 1` sizes describes `n` layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Topology {
    sizes: Vec<usize>,
}

impl Topology {
    pub fn new(sizes: Vec<usize>) -> Result<Topology> {
        if sizes.len() < 2 {
            return Err(Error::InvalidTopology(format!(
                "expected at least 2 layer sizes, got {}",
                sizes.len()
            )));
        }
        if let Some(index) = sizes.iter().position(|&size| size == 0) {
            return Err(Error::InvalidTopology(format!("layer size {index} is zero")));
        }
        if Topology::parameter_count(&sizes).is_none() {
            return Err(Error::InvalidTopology("parameter count overflows".to_owned()));
        }
        Ok(Topology { sizes })
    }

    /// Weights plus biases of a network with these layer sizes, or `None` when the
    /// total does not fit a `usize`.
    pub fn parameter_count(sizes: &[usize]) -> Option<usize> {
        sizes.windows(2).try_fold(0usize, |total, w| {
            w[0].checked_mul(w[1])?.checked_add(w[1])?.checked_add(total)
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of weighted layers.
    pub fn layers(&self) -> usize {
        self.sizes.len() - 1
    }

    pub fn features(&self) -> usize {
        self.sizes[0]
    }

    pub fn outputs(&self) -> usize {
        self.sizes[self.layers()]
    }

    /// Inputs of `layer`.
    pub fn features_of(&self, layer: usize) -> usize {
        self.sizes[layer]
    }

    /// Outputs of `layer`.
    pub fn neurons_of(&self, layer: usize) -> usize {
        self.sizes[layer + 1]
    }

    /// Total count of weights. Cannot overflow, see [`Topology::parameter_count`].
    pub fn weight_count(&self) -> usize {
        self.sizes.windows(2).map(|w| w[0] * w[1]).sum()
    }

    /// Total count of biases.
    pub fn bias_count(&self) -> usize {
        self.sizes[1..].iter().sum()
    }
}

impl TryFrom<Vec<usize>> for Topology {
    type Error = Error;

    fn try_from(sizes: Vec<usize>) -> Result<Topology> {
        Topology::new(sizes)
    }
}

impl From<Topology> for Vec<usize> {
    fn from(topology: Topology) -> Vec<usize> {
        topology.sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_layers_and_parameters() {
        let t = Topology::new(vec![4, 3, 2]).unwrap();
        assert_eq!(t.layers(), 2);
        assert_eq!((t.features(), t.outputs()), (4, 2));
        assert_eq!((t.features_of(1), t.neurons_of(1)), (3, 2));
        assert_eq!(t.weight_count(), 4 * 3 + 3 * 2);
        assert_eq!(t.bias_count(), 5);
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(matches!(Topology::new(vec![3]), Err(Error::InvalidTopology(_))));
        assert!(matches!(Topology::new(vec![]), Err(Error::InvalidTopology(_))));
        assert!(matches!(Topology::new(vec![2, 0, 1]), Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn parameter_count_overflow_is_rejected() {
        assert_eq!(Topology::parameter_count(&[4, 3, 2]), Some(18 + 5));
        let huge = vec![usize::MAX / 2; 3];
        assert_eq!(Topology::parameter_count(&huge), None);
        assert!(matches!(Topology::new(huge), Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn json_round_trip_validates() {
        let t = Topology::new(vec![2, 2, 1]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[2,2,1]");
        assert_eq!(serde_json::from_str::<Topology>(&json).unwrap(), t);
        assert!(serde_json::from_str::<Topology>("[5]").is_err());
    }
}
