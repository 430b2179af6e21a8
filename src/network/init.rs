use ndarray::{Array2, s};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use super::{Matrices, Topology};
use crate::error::ConfigErr;

/// How the canonical weights are filled when a trainer is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightInit {
    /// Normal distribution with `std_dev = sqrt(2 / (fan_in + fan_out))`, zero biases.
    #[default]
    XavierNormal,
    /// Uniform distribution in `[low, high)`, zero biases.
    Uniform { low: f32, high: f32 },
    /// Every weight and bias set to `value`.
    Constant { value: f32 },
}

impl WeightInit {
    /// Creates a full weight set for `topology`.
    ///
    /// # Arguments
    /// * `topology` - The shape of the network.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// An error if the distribution parameters are invalid.
    pub fn weights<R: Rng>(&self, topology: &Topology, rng: &mut R) -> Result<Matrices, ConfigErr> {
        let mut layers = Vec::with_capacity(topology.transitions());

        for (fan_in, fan_out) in topology.dims() {
            let shape = (fan_out, fan_in + 1);

            let layer = match *self {
                WeightInit::XavierNormal => {
                    let std_dev = (2. / (fan_in + fan_out) as f32).sqrt();
                    let normal = Normal::new(0., std_dev).map_err(|_| {
                        ConfigErr::InvalidHyperparameter {
                            name: "init.std_dev",
                            value: std_dev,
                        }
                    })?;
                    sample_weights(shape, &normal, rng)
                }
                WeightInit::Uniform { low, high } => {
                    let uniform = Uniform::new(low, high).map_err(|_| {
                        ConfigErr::InvalidHyperparameter {
                            name: "init.low",
                            value: low,
                        }
                    })?;
                    sample_weights(shape, &uniform, rng)
                }
                WeightInit::Constant { value } => Array2::from_elem(shape, value),
            };

            layers.push(layer);
        }

        Matrices::from_layers(topology, layers)
    }
}

fn sample_weights<D, R>(shape: (usize, usize), distribution: &D, rng: &mut R) -> Array2<f32>
where
    D: Distribution<f32>,
    R: Rng,
{
    let mut layer = Array2::from_shape_simple_fn(shape, || distribution.sample(&mut *rng));
    layer.slice_mut(s![.., shape.1 - 1]).fill(0.);
    layer
}
