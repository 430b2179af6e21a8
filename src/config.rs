use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigErr, LoadErr},
    network::{Topology, WeightInit},
};

/// The knobs of a training run, shared read-only with every worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    #[serde(rename = "batchSize")]
    pub batch_size: usize,
    #[serde(rename = "learningRate")]
    pub learning_rate: f32,
    #[serde(rename = "L1")]
    pub l1: f32,
    #[serde(rename = "L2")]
    pub l2: f32,
    pub momentum: f32,
    #[serde(rename = "dropOutRate")]
    pub dropout_rate: f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            batch_size: 32,
            learning_rate: 0.1,
            l1: 0.,
            l2: 0.,
            momentum: 0.,
            dropout_rate: 0.,
        }
    }
}

impl Hyperparameters {
    /// Checks every hyperparameter is inside of its domain.
    ///
    /// # Returns
    /// The first offending hyperparameter as a `ConfigErr`.
    pub fn validate(&self) -> Result<(), ConfigErr> {
        if self.batch_size == 0 {
            return Err(ConfigErr::ZeroBatchSize);
        }

        let invalid = |name, value| Err(ConfigErr::InvalidHyperparameter { name, value });

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return invalid("learningRate", self.learning_rate);
        }
        if !(self.l1.is_finite() && self.l1 >= 0.) {
            return invalid("L1", self.l1);
        }
        if !(self.l2.is_finite() && self.l2 >= 0.) {
            return invalid("L2", self.l2);
        }
        if !(0. ..1.).contains(&self.momentum) {
            return invalid("momentum", self.momentum);
        }
        if !(0. ..1.).contains(&self.dropout_rate) {
            return invalid("dropOutRate", self.dropout_rate);
        }

        Ok(())
    }
}

/// What happens to the tail of a window that `batch_size / threads` doesn't cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Every worker gets `batch_size / threads` positions, the rest of the window is skipped.
    #[default]
    Truncate,
    /// The window is split in `threads` contiguous ranges whose sizes differ by at most one.
    Spread,
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn default_epochs() -> usize {
    1
}

/// A complete training run description, as read by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub topology: Topology,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub init: WeightInit,
    #[serde(default)]
    pub remainder: RemainderPolicy,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

impl TrainingConfig {
    /// Parses and validates a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LoadErr> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadErr> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigErr> {
        if self.threads == 0 {
            return Err(ConfigErr::NoThreads);
        }

        self.hyperparameters.validate()
    }
}
