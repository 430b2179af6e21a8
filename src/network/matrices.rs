use std::ops::{Index, IndexMut};

use ndarray::Array2;

use super::Topology;
use crate::error::ConfigErr;

/// One matrix per layer transition, shaped `(outputs, inputs + 1)`.
///
/// Used both for weight sets and for gradients, the last column of every matrix
/// belongs to the biases.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrices(Vec<Array2<f32>>);

impl Matrices {
    /// Creates a zeroed set of matrices for `topology`.
    pub fn zeros(topology: &Topology) -> Self {
        Self(topology.shapes().map(Array2::zeros).collect())
    }

    /// Wraps already built matrices.
    ///
    /// # Arguments
    /// * `topology` - The topology the matrices must match.
    /// * `layers` - One matrix per transition.
    ///
    /// # Returns
    /// An error if any matrix has the wrong shape or the amount of matrices is off.
    pub fn from_layers(topology: &Topology, layers: Vec<Array2<f32>>) -> Result<Self, ConfigErr> {
        let matrices = Self(layers);
        matrices.check_shapes(topology)?;
        Ok(matrices)
    }

    /// Validates that these matrices belong to a network shaped as `topology`.
    pub fn check_shapes(&self, topology: &Topology) -> Result<(), ConfigErr> {
        if self.0.len() != topology.transitions() {
            return Err(ConfigErr::WeightShape {
                layer: self.0.len().min(topology.transitions()),
                got: (self.0.len(), 0),
                expected: (topology.transitions(), 0),
            });
        }

        for (layer, (m, expected)) in self.0.iter().zip(topology.shapes()).enumerate() {
            if m.dim() != expected {
                return Err(ConfigErr::WeightShape {
                    layer,
                    got: m.dim(),
                    expected,
                });
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Array2<f32>> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Array2<f32>> {
        self.0.iter_mut()
    }

    /// Sets every entry to zero, keeping the allocations.
    pub fn zero(&mut self) {
        self.0.iter_mut().for_each(|m| m.fill(0.));
    }

    /// Adds `other` elementwise into `self`.
    pub fn accumulate(&mut self, other: &Matrices) {
        self.scaled_add(1., other);
    }

    /// Performs `self += alpha * other` layer by layer.
    pub fn scaled_add(&mut self, alpha: f32, other: &Matrices) {
        self.0
            .iter_mut()
            .zip(&other.0)
            .for_each(|(m, o)| m.scaled_add(alpha, o));
    }

    /// Multiplies every entry by `factor`.
    pub fn scale(&mut self, factor: f32) {
        self.0.iter_mut().for_each(|m| *m *= factor);
    }

    /// Whether every entry is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|m| m.iter().all(|x| x.is_finite()))
    }

    /// The largest absolute elementwise difference between two sets of matrices.
    pub fn max_abs_diff(&self, other: &Matrices) -> f32 {
        self.0
            .iter()
            .zip(&other.0)
            .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()))
            .fold(0., f32::max)
    }

    pub fn into_layers(self) -> Vec<Array2<f32>> {
        self.0
    }
}

impl Index<usize> for Matrices {
    type Output = Array2<f32>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrices {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}
