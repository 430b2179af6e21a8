use std::ops::Range;

use ndarray::{Array1, ArrayView1, Zip, s};
use rand::rngs::StdRng;

use super::{Matrices, Samples, Topology};
use crate::error::NumericErr;

/// Everything a worker needs to run one gradient pass, borrowed from the batch's task.
#[derive(Debug, Clone)]
pub struct Pass<'a> {
    /// The canonical weights, read-only for the duration of the pass.
    pub weights: &'a Matrices,
    /// The whole dataset.
    pub samples: &'a Samples,
    /// The epoch's permutation of sample indices.
    pub indices: &'a [usize],
    /// The positions of `indices` this pass covers.
    pub range: Range<usize>,
    /// Probability of dropping a hidden unit.
    pub dropout_rate: f32,
}

impl Pass<'_> {
    /// Iterates the dataset indices of the samples this pass covers.
    pub fn sample_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices[self.range.clone()].iter().copied()
    }
}

/// The numeric core the worker pool drives.
///
/// A `Kernel` computes gradients; it never owns the canonical weights and never
/// touches the dataset outside of the range it is handed.
pub trait Kernel: Send + 'static {
    /// Creates a replica for a worker thread, sized for `topology` but without weights.
    fn replicate(&self, topology: &Topology) -> Self
    where
        Self: Sized;

    /// Adds into `grad` the loss gradient over the samples selected by `pass`.
    ///
    /// # Arguments
    /// * `pass` - The borrowed weights, samples and range to cover.
    /// * `rng` - The worker's own random number generator, used for dropout.
    /// * `grad` - The worker's gradient buffer, zeroed by the caller.
    ///
    /// # Errors
    /// Returns `NumericErr` if an index is out of bounds or a value stops being finite.
    fn compute_gradient(
        &mut self,
        pass: &Pass<'_>,
        rng: &mut StdRng,
        grad: &mut Matrices,
    ) -> Result<(), NumericErr>;

    /// Evaluates the network on a single input.
    fn predict(&self, weights: &Matrices, input: ArrayView1<f32>) -> Result<Array1<f32>, NumericErr>;

    /// Adds the L1 and L2 penalty terms of the non-bias weights into `grad`.
    fn apply_regularization(&self, l1: f32, l2: f32, weights: &Matrices, grad: &mut Matrices) {
        if l1 == 0. && l2 == 0. {
            return;
        }

        for (g, w) in grad.iter_mut().zip(weights.iter()) {
            let cols = w.ncols() - 1;
            Zip::from(g.slice_mut(s![.., ..cols]))
                .and(w.slice(s![.., ..cols]))
                .for_each(|g, &w| *g += l1 * sign(w) + l2 * w);
        }
    }

    /// Blends the previous gradient into the current one.
    fn apply_momentum(&self, momentum: f32, grad: &mut Matrices, prev_grad: &Matrices) {
        if momentum != 0. {
            grad.scaled_add(momentum, prev_grad);
        }
    }
}

fn sign(x: f32) -> f32 {
    if x > 0. {
        1.
    } else if x < 0. {
        -1.
    } else {
        0.
    }
}
