//! A persistent worker pool that parallelizes mini-batch gradient computation for
//! feed-forward networks.
//!
//! A [`Trainer`] owns the canonical weights and a fixed set of worker threads. Every
//! batch is split in one contiguous range per worker, the workers compute their local
//! gradients against a read-only view of the weights and the trainer merges them into a
//! single weight update before the next batch starts.

pub mod config;
pub mod error;
pub mod master;
pub mod network;
pub mod pool;
pub mod sync;
pub mod trainer;

pub use config::{Hyperparameters, RemainderPolicy, TrainingConfig};
pub use error::{ConfigErr, LifecycleErr, LoadErr, NumericErr, Result, TrainErr};
pub use network::{Kernel, Matrices, Mlp, Pass, Samples, Topology, WeightInit};
pub use trainer::{BatchRecord, State, TrainStats, Trainer};
