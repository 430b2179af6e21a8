use std::{
    sync::{Arc, atomic::Ordering},
    thread::{self, JoinHandle},
};

use log::{debug, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    slot::{Task, TaskSlot},
    worker,
};
use crate::{
    error::{Result, TrainErr},
    network::{Kernel, Matrices, Topology},
};

/// A fixed set of persistent gradient workers, each one with its own task slot.
#[derive(Debug, Default)]
pub struct WorkerPool {
    slots: Vec<Arc<TaskSlot>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `threads` workers, all of them idle until their first task.
    ///
    /// # Arguments
    /// * `threads` - The amount of workers.
    /// * `topology` - Sizes every worker's gradient pair and kernel replica.
    /// * `kernel` - The kernel every worker gets a replica of.
    /// * `rng` - Seeds the random number generator of every worker.
    ///
    /// # Errors
    /// `TrainErr::Spawn` if a thread can't be spawned; the already spawned ones are stopped.
    pub fn start<K: Kernel>(
        threads: usize,
        topology: &Topology,
        kernel: &K,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let mut pool = Self {
            slots: Vec::with_capacity(threads),
            handles: Vec::with_capacity(threads),
        };

        for id in 0..threads {
            let slot = Arc::new(TaskSlot::new(topology));
            let replica = kernel.replicate(topology);
            let worker_rng = StdRng::seed_from_u64(rng.random());

            let handle = thread::Builder::new()
                .name(format!("gradient-worker-{id}"))
                .spawn({
                    let slot = Arc::clone(&slot);
                    move || worker::run(id, slot, replica, worker_rng)
                })
                .map_err(TrainErr::Spawn)?;

            pool.slots.push(slot);
            pool.handles.push(handle);
        }

        debug!(threads = threads; "worker pool started");
        Ok(pool)
    }

    /// Hands `task` to worker `id` and wakes it up.
    pub fn assign(&self, id: usize, task: Task) {
        let slot = &self.slots[id];
        slot.state.lock().task = Some(task);
        slot.wake.signal();
    }

    /// Waits for worker `id` to finish its pass and lends its gradient to `f`.
    ///
    /// # Errors
    /// `TrainErr::Computation` if the pass failed, `TrainErr::WorkerLost` if the worker
    /// died before reporting back.
    pub fn collect<F>(&self, id: usize, f: F) -> Result<()>
    where
        F: FnOnce(&Matrices),
    {
        let slot = &self.slots[id];

        if !slot.done.wait() {
            return Err(TrainErr::WorkerLost { worker: id });
        }
        slot.done.reset();

        let state = slot.state.lock();
        match &state.outcome {
            Ok(()) => {
                f(&state.grad);
                Ok(())
            }
            Err(e) => Err(TrainErr::Computation {
                worker: id,
                source: e.clone(),
            }),
        }
    }

    /// Flags every worker to quit, wakes them up and joins them. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        for slot in &self.slots {
            slot.must_quit.store(true, Ordering::Release);
            slot.wake.signal();
        }

        for (id, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                warn!(worker = id; "worker panicked");
            }
        }

        self.slots.clear();
        debug!("worker pool stopped");
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
