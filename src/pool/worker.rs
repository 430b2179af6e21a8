use std::{
    mem,
    sync::{Arc, atomic::Ordering},
};

use log::{debug, trace, warn};
use rand::rngs::StdRng;

use super::slot::{SlotState, Task, TaskSlot};
use crate::{
    error::NumericErr,
    network::{Kernel, Pass},
    sync::Event,
};

/// Closes the `done` event when the worker exits, panics included, so the orchestrator
/// never waits on a dead thread.
struct Abandon<'a>(&'a Event);

impl Drop for Abandon<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// The body of a worker thread.
///
/// Sleeps on the slot's `wake` event, runs one gradient pass per signal and reports
/// back through `done`, until the slot is flagged to quit.
///
/// # Arguments
/// * `id` - The index of this worker in the pool.
/// * `slot` - The slot shared with the orchestrator.
/// * `kernel` - This worker's own replica of the numeric core.
/// * `rng` - This worker's own random number generator.
pub(super) fn run<K: Kernel>(id: usize, slot: Arc<TaskSlot>, mut kernel: K, mut rng: StdRng) {
    let _abandon = Abandon(&slot.done);
    debug!(worker = id; "worker started");

    while slot.wake.wait() {
        if slot.must_quit.load(Ordering::Acquire) {
            break;
        }

        let mut state = slot.state.lock();
        let Some(task) = state.task.take() else {
            warn!(worker = id; "woken without a task");
            continue;
        };

        trace!(worker = id, start = task.range.start, end = task.range.end; "computing gradient");
        let outcome = compute(&mut kernel, &mut rng, task, &mut state);

        if let Err(e) = &outcome {
            warn!(worker = id; "gradient pass failed: {e}");
        }

        state.outcome = outcome;
        drop(state);

        slot.wake.reset();
        slot.done.signal();
    }

    debug!(worker = id; "worker stopped");
}

/// Runs a full pass over `task` into the slot's gradient pair.
///
/// The task, and with it the worker's view of the weights, is dropped on return.
fn compute<K: Kernel>(
    kernel: &mut K,
    rng: &mut StdRng,
    task: Task,
    state: &mut SlotState,
) -> Result<(), NumericErr> {
    let SlotState {
        grad, prev_grad, ..
    } = state;
    let h = task.hyperparameters;

    mem::swap(grad, prev_grad);
    grad.zero();

    let pass = Pass {
        weights: &task.weights,
        samples: &task.samples,
        indices: &task.indices,
        range: task.range.clone(),
        dropout_rate: h.dropout_rate,
    };

    kernel.compute_gradient(&pass, rng, grad)?;
    kernel.apply_regularization(h.l1, h.l2, &task.weights, grad);
    kernel.apply_momentum(h.momentum, grad, prev_grad);

    Ok(())
}
