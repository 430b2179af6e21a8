use std::{mem, sync::Arc};

use rand::{rngs::StdRng, seq::SliceRandom};

use crate::{
    config::Hyperparameters,
    error::{ConfigErr, LifecycleErr},
    network::{Matrices, Topology},
};

/// The orchestrator-owned half of a training run.
///
/// Holds the canonical weights, the gradient accumulator pair and the index vector.
/// Workers only ever see the weights and the indices through `Arc` clones handed to
/// them in their tasks, so every mutation here goes through `Arc::get_mut` or
/// `Arc::make_mut`.
#[derive(Debug)]
pub struct Master {
    topology: Topology,
    weights: Arc<Matrices>,
    grad: Matrices,
    prev_grad: Matrices,
    indices: Arc<Vec<usize>>,
    hyperparameters: Hyperparameters,
    rng: StdRng,
}

impl Master {
    /// Creates a new `Master`.
    ///
    /// # Arguments
    /// * `topology` - The shape of the network.
    /// * `weights` - The initial canonical weights, already checked against `topology`.
    /// * `hyperparameters` - The hyperparameters of the run.
    /// * `rng` - Drives the shuffling of the index vector.
    pub fn new(
        topology: Topology,
        weights: Matrices,
        hyperparameters: Hyperparameters,
        rng: StdRng,
    ) -> Self {
        let grad = Matrices::zeros(&topology);
        let prev_grad = grad.clone();

        Self {
            topology,
            weights: Arc::new(weights),
            grad,
            prev_grad,
            indices: Arc::new(Vec::new()),
            hyperparameters,
            rng,
        }
    }

    /// Readies the index vector for a call over `n` samples.
    ///
    /// The vector is reset to the identity whenever `n` changed and shuffled unless the
    /// whole dataset is a single batch.
    ///
    /// # Returns
    /// Whether the index vector was shuffled.
    pub fn prepare_indices(&mut self, n: usize) -> bool {
        let indices = Arc::make_mut(&mut self.indices);

        if indices.len() != n {
            indices.clear();
            indices.extend(0..n);
        }

        if self.hyperparameters.batch_size != n {
            indices.shuffle(&mut self.rng);
            return true;
        }

        false
    }

    /// Moves the current gradient into the previous slot and zeroes the current one.
    pub fn swap_and_zero(&mut self) {
        mem::swap(&mut self.grad, &mut self.prev_grad);
        self.grad.zero();
    }

    /// Adds a worker's gradient into the accumulator.
    pub fn accumulate(&mut self, grad: &Matrices) {
        self.grad.accumulate(grad);
    }

    /// Turns the accumulated sum into a mean over `count` samples.
    pub fn normalize(&mut self, count: usize) {
        self.grad.scale(1. / count.max(1) as f32);
    }

    /// Applies `w -= learning_rate * g` to the canonical weights.
    ///
    /// # Errors
    /// `LifecycleErr::WeightsShared` if a worker still holds its view of the weights.
    pub fn update_weights(&mut self) -> Result<(), LifecycleErr> {
        let lr = self.hyperparameters.learning_rate;
        let weights = Arc::get_mut(&mut self.weights).ok_or(LifecycleErr::WeightsShared)?;
        weights.scaled_add(-lr, &self.grad);
        Ok(())
    }

    /// Replaces the canonical weights.
    ///
    /// # Errors
    /// `ConfigErr::WeightShape` if `weights` doesn't match the topology.
    pub fn set_weights(&mut self, weights: Matrices) -> Result<(), ConfigErr> {
        weights.check_shapes(&self.topology)?;
        self.weights = Arc::new(weights);
        Ok(())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn weights(&self) -> &Matrices {
        &self.weights
    }

    /// A new handle to the weights, meant to be moved into a worker task.
    pub fn share_weights(&self) -> Arc<Matrices> {
        Arc::clone(&self.weights)
    }

    /// A new handle to the index vector, meant to be moved into a worker task.
    pub fn share_indices(&self) -> Arc<Vec<usize>> {
        Arc::clone(&self.indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The gradient applied by the last update.
    pub fn gradient(&self) -> &Matrices {
        &self.grad
    }

    /// The gradient applied by the update before the last one.
    pub fn previous_gradient(&self) -> &Matrices {
        &self.prev_grad
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn set_hyperparameters(&mut self, hyperparameters: Hyperparameters) {
        self.hyperparameters = hyperparameters;
    }

    pub fn set_rng(&mut self, rng: StdRng) {
        self.rng = rng;
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr2, array};
    use rand::SeedableRng;

    use super::*;

    fn master(batch_size: usize) -> Master {
        let topology = Topology::new([2, 1]).unwrap();
        let weights = Matrices::from_layers(&topology, vec![array![[1., 2., 3.]]]).unwrap();
        let hyperparameters = Hyperparameters {
            batch_size,
            learning_rate: 0.5,
            ..Default::default()
        };

        Master::new(topology, weights, hyperparameters, StdRng::seed_from_u64(42))
    }

    fn grad(values: [f32; 3]) -> Matrices {
        let topology = Topology::new([2, 1]).unwrap();
        Matrices::from_layers(&topology, vec![arr2(&[values])]).unwrap()
    }

    #[test]
    fn indices_are_a_permutation() {
        let mut master = master(4);

        assert!(master.prepare_indices(10));
        let mut sorted = master.indices().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn single_batch_keeps_the_identity() {
        let mut master = master(5);

        assert!(!master.prepare_indices(5));
        assert_eq!(master.indices(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn indices_reset_when_the_dataset_size_changes() {
        let mut master = master(3);
        master.prepare_indices(6);
        master.prepare_indices(3);

        assert_eq!(master.indices(), [0, 1, 2]);
    }

    #[test]
    fn shared_indices_are_not_mutated_in_place() {
        let mut master = master(2);
        master.prepare_indices(8);

        let held = master.share_indices();
        let snapshot = held.to_vec();
        master.prepare_indices(8);

        assert_eq!(*held, snapshot);
    }

    #[test]
    fn accumulate_normalize_and_update() {
        let mut master = master(2);
        master.swap_and_zero();
        master.accumulate(&grad([1., 1., 1.]));
        master.accumulate(&grad([3., 1., -1.]));
        master.normalize(2);

        assert_eq!(master.gradient()[0], array![[2., 1., 0.]]);

        master.update_weights().unwrap();
        assert_eq!(master.weights()[0], array![[0., 1.5, 3.]]);

        master.swap_and_zero();
        assert_eq!(master.previous_gradient()[0], array![[2., 1., 0.]]);
        assert_eq!(master.gradient()[0], array![[0., 0., 0.]]);
    }

    #[test]
    fn update_fails_while_a_worker_holds_the_weights() {
        let mut master = master(2);
        let held = master.share_weights();

        assert_eq!(master.update_weights(), Err(LifecycleErr::WeightsShared));
        drop(held);
        assert!(master.update_weights().is_ok());
    }

    #[test]
    fn normalizing_by_zero_is_a_no_op() {
        let mut master = master(2);
        master.accumulate(&grad([4., 2., 0.]));
        master.normalize(0);

        assert_eq!(master.gradient()[0], array![[4., 2., 0.]]);
    }
}
