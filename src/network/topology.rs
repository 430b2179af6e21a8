use serde::{Deserialize, Serialize};

use crate::error::ConfigErr;

/// The amount of units of each layer of a feed-forward network, input layer first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Topology(Vec<usize>);

impl Topology {
    /// Creates a new `Topology`.
    ///
    /// # Arguments
    /// * `layers` - The width of every layer.
    ///
    /// # Returns
    /// An error if there are less than two layers or any of them is empty.
    pub fn new<I>(layers: I) -> Result<Self, ConfigErr>
    where
        I: IntoIterator<Item = usize>,
    {
        let layers: Vec<_> = layers.into_iter().collect();

        if layers.len() < 2 {
            return Err(ConfigErr::TopologyTooShort {
                layers: layers.len(),
            });
        }

        if let Some(layer) = layers.iter().position(|&units| units == 0) {
            return Err(ConfigErr::EmptyLayer { layer });
        }

        Ok(Self(layers))
    }

    /// The width of every layer.
    pub fn layers(&self) -> &[usize] {
        &self.0
    }

    /// The amount of weight matrices, one per pair of adjacent layers.
    pub fn transitions(&self) -> usize {
        self.0.len() - 1
    }

    /// Iterates the `(inputs, outputs)` of every transition.
    pub fn dims(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// The shape of the matrix of each transition, the extra column holds the biases.
    pub fn shapes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.dims().map(|(inputs, outputs)| (outputs, inputs + 1))
    }

    pub fn input_width(&self) -> usize {
        self.0[0]
    }

    pub fn output_width(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Total amount of trainable scalars.
    pub fn num_params(&self) -> usize {
        self.shapes().map(|(rows, cols)| rows * cols).sum()
    }
}

impl TryFrom<Vec<usize>> for Topology {
    type Error = ConfigErr;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topology> for Vec<usize> {
    fn from(value: Topology) -> Self {
        value.0
    }
}
