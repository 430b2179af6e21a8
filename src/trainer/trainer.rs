use std::sync::Arc;

use log::{debug, info, trace, warn};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use super::{
    plan::{batch_windows, partition},
    stats::{BatchRecord, TrainStats},
};
use crate::{
    config::{Hyperparameters, RemainderPolicy, TrainingConfig},
    error::{ConfigErr, LifecycleErr, NumericErr, Result, TrainErr},
    master::Master,
    network::{Kernel, Matrices, Mlp, Samples, Topology, WeightInit},
    pool::{Task, WorkerPool},
};

/// Where a `Trainer` is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// `initialize` hasn't succeeded yet.
    Uninitialized,
    /// The pool is up and `train` may be called.
    Running,
    /// `stop` was called, the weights remain readable.
    Stopped,
    /// A batch failed mid-flight; `initialize` must be called again.
    Faulted,
}

/// Drives mini-batch gradient descent over a persistent pool of gradient workers.
///
/// Every batch is split in one contiguous range per worker, the workers compute their
/// gradients in parallel against a read-only view of the weights and the orchestrator
/// merges them, in worker order, into a single weight update.
#[derive(Debug)]
pub struct Trainer<K: Kernel = Mlp> {
    kernel: K,
    hyperparameters: Hyperparameters,
    init: WeightInit,
    remainder: RemainderPolicy,
    seed: Option<u64>,
    threads: usize,
    state: State,
    master: Option<Master>,
    pool: WorkerPool,
}

impl Trainer<Mlp> {
    /// Creates and initializes an `Mlp` trainer from a `TrainingConfig`.
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        let mut trainer = Self::new(Mlp::new(), config.hyperparameters)
            .with_init(config.init)
            .with_remainder_policy(config.remainder);

        if let Some(seed) = config.seed {
            trainer.seed(seed);
        }

        trainer.initialize(config.topology.clone(), config.threads)?;
        Ok(trainer)
    }
}

impl<K: Kernel> Trainer<K> {
    /// Creates a new, uninitialized `Trainer`.
    ///
    /// # Arguments
    /// * `kernel` - The numeric core; every worker gets a replica of it.
    /// * `hyperparameters` - Validated on every `train` call.
    pub fn new(kernel: K, hyperparameters: Hyperparameters) -> Self {
        Self {
            kernel,
            hyperparameters,
            init: WeightInit::default(),
            remainder: RemainderPolicy::default(),
            seed: None,
            threads: 0,
            state: State::Uninitialized,
            master: None,
            pool: WorkerPool::default(),
        }
    }

    /// Creates a new `Trainer` and initializes it right away.
    pub fn with_topology(
        kernel: K,
        hyperparameters: Hyperparameters,
        topology: Topology,
        threads: usize,
    ) -> Result<Self> {
        let mut trainer = Self::new(kernel, hyperparameters);
        trainer.initialize(topology, threads)?;
        Ok(trainer)
    }

    /// Sets how `initialize` fills the weights.
    pub fn with_init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    pub fn with_remainder_policy(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Builds fresh weights for `topology` and starts `threads` workers.
    ///
    /// A running pool is stopped first, but only once the new arguments are known to be
    /// valid: on a `ConfigErr` the trainer is left as it was.
    ///
    /// # Errors
    /// `TrainErr::Config` for zero threads or an invalid weight initialization,
    /// `TrainErr::Spawn` if the pool can't be started.
    pub fn initialize(&mut self, topology: Topology, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(ConfigErr::NoThreads.into());
        }

        let mut rng = generate_rng(self.seed);
        let weights = self.init.weights(&topology, &mut rng)?;

        self.pool.stop();
        self.master = None;
        self.state = State::Uninitialized;

        self.pool = WorkerPool::start(threads, &topology, &self.kernel, &mut rng)?;
        info!(
            threads = threads,
            params = topology.num_params();
            "trainer initialized with topology {:?}",
            topology.layers()
        );

        self.master = Some(Master::new(topology, weights, self.hyperparameters, rng));
        self.threads = threads;
        self.state = State::Running;
        Ok(())
    }

    /// Runs one pass over the dataset, one weight update per batch.
    ///
    /// # Arguments
    /// * `inputs` - One sample per row, as wide as the input layer.
    /// * `targets` - One target per row, as wide as the output layer.
    ///
    /// # Returns
    /// What every batch of the pass did.
    ///
    /// # Errors
    /// Lifecycle and configuration errors are reported before any worker is woken up
    /// and leave the trainer untouched. A failed worker faults the trainer.
    pub fn train(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<TrainStats> {
        self.check_running()?;
        let hyperparameters = self.hyperparameters;
        hyperparameters.validate()?;

        let Some(master) = self.master.as_mut() else {
            return Err(LifecycleErr::NotInitialized.into());
        };

        let samples = Samples::from_views(inputs, targets)?;
        samples.check_widths(master.topology())?;

        let n = samples.len();
        let mut stats = TrainStats::default();
        if n == 0 {
            return Ok(stats);
        }

        let samples = Arc::new(samples);
        let batch_size = hyperparameters.batch_size;
        master.set_hyperparameters(hyperparameters);
        master.prepare_indices(n);

        debug!(samples = n, batch_size = batch_size; "training pass started");

        for window in batch_windows(n, batch_size) {
            let ranges = partition(window.clone(), self.threads, batch_size, self.remainder);
            let batch = BatchRecord { window, ranges };

            if let Err(e) = run_batch(master, &self.pool, &samples, &batch, hyperparameters) {
                warn!("batch {:?} failed, the trainer is now faulted: {e}", batch.window);
                self.state = State::Faulted;
                return Err(e);
            }

            let dropped = batch.dropped();
            if dropped > 0 {
                debug!(dropped = dropped; "batch {:?} left samples unassigned", batch.window);
            }

            stats.record(batch);
        }

        debug!(updates = stats.updates, dropped = stats.dropped; "training pass finished");
        Ok(stats)
    }

    /// Stops every worker. Calling it again is a no-op; the weights remain readable.
    pub fn stop(&mut self) {
        self.pool.stop();

        if self.state != State::Uninitialized {
            self.state = State::Stopped;
        }
    }

    /// Evaluates the current weights on a single input.
    pub fn predict(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let master = self.master()?;
        let expected = master.topology().input_width();

        if input.len() != expected {
            return Err(ConfigErr::WidthMismatch {
                what: "input",
                got: input.len(),
                expected,
            }
            .into());
        }

        self.kernel
            .predict(master.weights(), input)
            .map_err(TrainErr::Evaluation)
    }

    /// The current weights, if the trainer was ever initialized.
    pub fn weights(&self) -> Option<&Matrices> {
        self.master.as_ref().map(Master::weights)
    }

    /// Replaces the weights of an initialized trainer.
    ///
    /// # Errors
    /// `ConfigErr::WeightShape` if `weights` doesn't match the topology.
    pub fn set_weights(&mut self, weights: Matrices) -> Result<()> {
        let master = self
            .master
            .as_mut()
            .ok_or(LifecycleErr::NotInitialized)?;

        master.set_weights(weights)?;
        Ok(())
    }

    /// The gradient applied by the update before the last one.
    pub fn previous_gradient(&self) -> Option<&Matrices> {
        self.master.as_ref().map(Master::previous_gradient)
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.master.as_ref().map(Master::topology)
    }

    /// The amount of workers of the last successful `initialize`.
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Replaces the hyperparameters used by the next `train` call.
    pub fn set_hyperparameters(&mut self, hyperparameters: Hyperparameters) -> Result<()> {
        hyperparameters.validate()?;
        self.hyperparameters = hyperparameters;
        Ok(())
    }

    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder
    }

    pub fn set_remainder_policy(&mut self, remainder: RemainderPolicy) {
        self.remainder = remainder;
    }

    /// Makes weight initialization and shuffling reproducible.
    ///
    /// Takes effect on the next `initialize`; on an initialized trainer it also reseeds
    /// the shuffling of the index vector.
    pub fn seed(&mut self, seed: u64) {
        self.seed = Some(seed);

        if let Some(master) = self.master.as_mut() {
            master.set_rng(StdRng::seed_from_u64(seed));
        }
    }

    fn check_running(&self) -> std::result::Result<(), LifecycleErr> {
        match self.state {
            State::Running => Ok(()),
            State::Uninitialized => Err(LifecycleErr::NotInitialized),
            State::Stopped => Err(LifecycleErr::Stopped),
            State::Faulted => Err(LifecycleErr::Faulted),
        }
    }

    fn master(&self) -> std::result::Result<&Master, LifecycleErr> {
        self.master.as_ref().ok_or(LifecycleErr::NotInitialized)
    }
}

impl<K: Kernel + Sync> Trainer<K> {
    /// The mean squared error of the current weights over a dataset.
    ///
    /// Samples are evaluated in parallel on the rayon thread pool, not on the workers.
    pub fn evaluate(&self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        let master = self.master()?;
        let samples = Samples::from_views(inputs, targets)?;
        samples.check_widths(master.topology())?;

        if samples.is_empty() {
            return Ok(0.);
        }

        let weights = master.weights();
        let errors = (0..samples.len())
            .into_par_iter()
            .map(|i| -> std::result::Result<f32, NumericErr> {
                let output = self.kernel.predict(weights, samples.input(i))?;
                Ok((&output - &samples.target(i)).mapv(|e| e * e).sum())
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(TrainErr::Evaluation)?;

        let total: f32 = errors.iter().sum();
        Ok(total / (samples.len() * master.topology().output_width()) as f32)
    }
}

impl<K: Kernel> Drop for Trainer<K> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs a single batch: hands out the ranges, merges the gradients, updates the weights.
///
/// Every worker is collected even after a failure, so no worker is left holding the
/// weights when this returns.
fn run_batch(
    master: &mut Master,
    pool: &WorkerPool,
    samples: &Arc<Samples>,
    batch: &BatchRecord,
    hyperparameters: Hyperparameters,
) -> Result<()> {
    trace!("assigning batch {:?}: {:?}", batch.window, batch.ranges);

    for (id, range) in batch.ranges.iter().enumerate() {
        pool.assign(
            id,
            Task {
                range: range.clone(),
                weights: master.share_weights(),
                samples: Arc::clone(samples),
                indices: master.share_indices(),
                hyperparameters,
            },
        );
    }

    master.swap_and_zero();

    let mut failure = None;
    for id in 0..batch.ranges.len() {
        if let Err(e) = pool.collect(id, |grad| master.accumulate(grad)) {
            failure.get_or_insert(e);
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    master.normalize(batch.assigned());
    master.update_weights()?;
    Ok(())
}

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn hyperparameters(batch_size: usize) -> Hyperparameters {
        Hyperparameters {
            batch_size,
            learning_rate: 0.5,
            ..Default::default()
        }
    }

    fn trainer(threads: usize, batch_size: usize) -> Trainer {
        let mut trainer = Trainer::new(Mlp::new(), hyperparameters(batch_size));
        trainer.seed(11);
        trainer
            .initialize(Topology::new([2, 3, 1]).unwrap(), threads)
            .unwrap();
        trainer
    }

    #[test]
    fn train_before_initialize_is_rejected() {
        let mut trainer = Trainer::new(Mlp::new(), hyperparameters(4));
        let x = array![[0., 1.]];
        let y = array![[1.]];

        assert!(matches!(
            trainer.train(x.view(), y.view()),
            Err(TrainErr::Lifecycle(LifecycleErr::NotInitialized))
        ));
        assert_eq!(trainer.state(), State::Uninitialized);
    }

    #[test]
    fn same_seed_same_initial_weights() {
        let a = trainer(2, 4);
        let b = trainer(3, 4);

        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn reinitializing_restarts_the_pool() {
        let mut trainer = trainer(2, 4);
        trainer
            .initialize(Topology::new([2, 5, 5, 1]).unwrap(), 3)
            .unwrap();

        assert_eq!(trainer.threads(), 3);
        assert_eq!(trainer.weights().unwrap().len(), 3);
        assert_eq!(trainer.state(), State::Running);
    }

    #[test]
    fn invalid_reinitialization_keeps_the_running_pool() {
        let mut trainer = trainer(2, 4);
        let before = trainer.weights().cloned();

        assert!(matches!(
            trainer.initialize(Topology::new([2, 1]).unwrap(), 0),
            Err(TrainErr::Config(ConfigErr::NoThreads))
        ));
        assert_eq!(trainer.state(), State::Running);
        assert_eq!(trainer.weights().cloned(), before);
        assert_eq!(trainer.threads(), 2);
    }

    #[test]
    fn set_weights_checks_the_shape() {
        let mut trainer = trainer(1, 4);
        let wrong = Matrices::zeros(&Topology::new([2, 1]).unwrap());

        assert!(matches!(
            trainer.set_weights(wrong),
            Err(TrainErr::Config(ConfigErr::WeightShape { .. }))
        ));

        let right = Matrices::zeros(&Topology::new([2, 3, 1]).unwrap());
        trainer.set_weights(right.clone()).unwrap();
        assert_eq!(trainer.weights(), Some(&right));
    }

    #[test]
    fn predict_and_evaluate_agree() {
        let trainer = trainer(2, 4);
        let x = array![[0., 1.], [1., 1.]];
        let y = array![[1.], [0.]];

        let p0 = trainer.predict(x.row(0)).unwrap()[0];
        let p1 = trainer.predict(x.row(1)).unwrap()[0];
        let expected = ((p0 - 1.).powi(2) + p1.powi(2)) / 2.;

        let mse = trainer.evaluate(x.view(), y.view()).unwrap();
        assert!((mse - expected).abs() < 1e-6);
    }

    #[test]
    fn predict_checks_the_input_width() {
        let trainer = trainer(1, 4);
        let x = array![1., 2., 3.];

        assert!(matches!(
            trainer.predict(x.view()),
            Err(TrainErr::Config(ConfigErr::WidthMismatch { .. }))
        ));
    }

    #[test]
    fn invalid_hyperparameters_are_not_stored() {
        let mut trainer = trainer(1, 4);

        assert!(
            trainer
                .set_hyperparameters(Hyperparameters {
                    momentum: 2.,
                    ..hyperparameters(4)
                })
                .is_err()
        );
        assert_eq!(trainer.hyperparameters().momentum, 0.);
    }

    #[test]
    fn empty_datasets_do_nothing() {
        let mut trainer = trainer(2, 4);
        let before = trainer.weights().cloned();
        let x = ndarray::Array2::<f32>::zeros((0, 2));
        let y = ndarray::Array2::<f32>::zeros((0, 1));

        let stats = trainer.train(x.view(), y.view()).unwrap();

        assert_eq!(stats, TrainStats::default());
        assert_eq!(trainer.weights().cloned(), before);
    }
}
