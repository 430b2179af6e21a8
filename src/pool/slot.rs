use std::{
    ops::Range,
    sync::{Arc, atomic::AtomicBool},
};

use parking_lot::Mutex;

use crate::{
    config::Hyperparameters,
    error::NumericErr,
    network::{Matrices, Samples, Topology},
    sync::Event,
};

/// The work of a single worker for a single batch.
#[derive(Debug)]
pub struct Task {
    /// Positions of the index vector to process.
    pub range: Range<usize>,
    pub weights: Arc<Matrices>,
    pub samples: Arc<Samples>,
    pub indices: Arc<Vec<usize>>,
    pub hyperparameters: Hyperparameters,
}

/// The data half of a slot, handed back and forth between a worker and the orchestrator.
#[derive(Debug)]
pub(super) struct SlotState {
    pub task: Option<Task>,
    pub grad: Matrices,
    pub prev_grad: Matrices,
    pub outcome: Result<(), NumericErr>,
}

/// Everything shared between the orchestrator and one worker thread.
///
/// `wake` flows orchestrator to worker, `done` flows back. Whoever has been signaled
/// last owns `state`, so its mutex is never contended.
#[derive(Debug)]
pub(super) struct TaskSlot {
    pub wake: Event,
    pub done: Event,
    pub must_quit: AtomicBool,
    pub state: Mutex<SlotState>,
}

impl TaskSlot {
    /// Creates a new idle slot with a zeroed gradient pair sized for `topology`.
    pub fn new(topology: &Topology) -> Self {
        let grad = Matrices::zeros(topology);

        Self {
            wake: Event::new(),
            done: Event::new(),
            must_quit: AtomicBool::new(false),
            state: Mutex::new(SlotState {
                task: None,
                prev_grad: grad.clone(),
                grad,
                outcome: Ok(()),
            }),
        }
    }
}
