mod plan;
mod stats;
mod trainer;

pub use plan::{batch_windows, partition};
pub use stats::{BatchRecord, TrainStats};
pub use trainer::{State, Trainer};
