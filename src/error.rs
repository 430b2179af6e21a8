use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Every failure a `Trainer` can report.
#[derive(Debug)]
pub enum TrainErr {
    /// The request was rejected before any worker was signaled.
    Config(ConfigErr),
    /// The trainer is not in a state that allows the requested operation.
    Lifecycle(LifecycleErr),
    /// A worker's gradient pass failed, the trainer is now faulted.
    Computation { worker: usize, source: NumericErr },
    /// A worker thread died while a batch was in flight.
    WorkerLost { worker: usize },
    /// Evaluating the network on the calling thread failed.
    Evaluation(NumericErr),
    /// The OS refused to spawn a worker thread.
    Spawn(io::Error),
}

impl Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::Config(e) => write!(f, "configuration error: {e}"),
            TrainErr::Lifecycle(e) => write!(f, "lifecycle error: {e}"),
            TrainErr::Computation { worker, source } => {
                write!(f, "worker {worker} failed to compute its gradient: {source}")
            }
            TrainErr::WorkerLost { worker } => {
                write!(f, "worker {worker} terminated while a batch was in flight")
            }
            TrainErr::Evaluation(e) => write!(f, "evaluation failed: {e}"),
            TrainErr::Spawn(e) => write!(f, "failed to spawn worker thread: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Config(e) => Some(e),
            TrainErr::Lifecycle(e) => Some(e),
            TrainErr::Computation { source, .. } => Some(source),
            TrainErr::Evaluation(e) => Some(e),
            TrainErr::Spawn(e) => Some(e),
            TrainErr::WorkerLost { .. } => None,
        }
    }
}

impl From<ConfigErr> for TrainErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

impl From<LifecycleErr> for TrainErr {
    fn from(value: LifecycleErr) -> Self {
        Self::Lifecycle(value)
    }
}

/// Invalid topologies, hyperparameters or datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErr {
    /// A topology needs at least an input and an output layer.
    TopologyTooShort { layers: usize },
    /// Every layer must have at least one unit.
    EmptyLayer { layer: usize },
    /// The pool needs at least one worker.
    NoThreads,
    /// `batch_size` must be positive.
    ZeroBatchSize,
    /// A hyperparameter is outside of its domain.
    InvalidHyperparameter { name: &'static str, value: f32 },
    /// Inputs and targets must hold the same amount of samples.
    SampleCountMismatch { inputs: usize, targets: usize },
    /// The width of a sample doesn't match the topology.
    WidthMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A replacement weight set doesn't match the topology.
    WeightShape {
        layer: usize,
        got: (usize, usize),
        expected: (usize, usize),
    },
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::TopologyTooShort { layers } => {
                write!(f, "a topology needs at least 2 layers, got {layers}")
            }
            ConfigErr::EmptyLayer { layer } => write!(f, "layer {layer} has no units"),
            ConfigErr::NoThreads => f.write_str("the worker pool needs at least one thread"),
            ConfigErr::ZeroBatchSize => f.write_str("batch size must be positive"),
            ConfigErr::InvalidHyperparameter { name, value } => {
                write!(f, "hyperparameter {name} has an invalid value: {value}")
            }
            ConfigErr::SampleCountMismatch { inputs, targets } => {
                write!(f, "got {inputs} inputs but {targets} targets")
            }
            ConfigErr::WidthMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} width is {got}, the topology expects {expected}"),
            ConfigErr::WeightShape {
                layer,
                got,
                expected,
            } => write!(
                f,
                "weights of layer {layer} have shape {got:?}, expected {expected:?}"
            ),
        }
    }
}

impl Error for ConfigErr {}

/// Operations called at the wrong point of the trainer's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleErr {
    /// `train` was called before `initialize`.
    NotInitialized,
    /// `train` was called after `stop`.
    Stopped,
    /// A previous `train` call failed mid-batch; the trainer must be re-initialized.
    Faulted,
    /// A worker still held a view of the weights when the update was due.
    WeightsShared,
}

impl Display for LifecycleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleErr::NotInitialized => "the trainer has not been initialized",
            LifecycleErr::Stopped => "the worker pool has been stopped",
            LifecycleErr::Faulted => "a previous run failed, re-initialize the trainer",
            LifecycleErr::WeightsShared => "the weights are still borrowed by a worker",
        };

        f.write_str(s)
    }
}

impl Error for LifecycleErr {}

/// Failures of the numeric core while running a gradient pass.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericErr {
    /// A forward or backward pass produced NaN or infinity.
    NonFinite { layer: usize, sample: usize },
    /// An index vector entry points outside of the dataset.
    SampleOutOfBounds { index: usize, len: usize },
    /// A buffer doesn't have the shape the pass expects.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

impl Display for NumericErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericErr::NonFinite { layer, sample } => {
                write!(f, "non-finite value at layer {layer} for sample {sample}")
            }
            NumericErr::SampleOutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for {len} samples")
            }
            NumericErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
        }
    }
}

impl Error for NumericErr {}

/// Failures while loading a `TrainingConfig` from disk.
#[derive(Debug)]
pub enum LoadErr {
    Io(io::Error),
    Json(serde_json::Error),
    Invalid(ConfigErr),
}

impl Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErr::Io(e) => write!(f, "cannot read config: {e}"),
            LoadErr::Json(e) => write!(f, "invalid config JSON: {e}"),
            LoadErr::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadErr::Io(e) => Some(e),
            LoadErr::Json(e) => Some(e),
            LoadErr::Invalid(e) => Some(e),
        }
    }
}

impl From<io::Error> for LoadErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for LoadErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ConfigErr> for LoadErr {
    fn from(value: ConfigErr) -> Self {
        Self::Invalid(value)
    }
}
