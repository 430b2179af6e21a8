#![allow(dead_code)]

use std::{ops::Range, sync::Arc};

use gradient_pool::{Kernel, Matrices, NumericErr, Pass, Topology};
use ndarray::{Array1, Array2, ArrayView1};
use parking_lot::Mutex;
use rand::rngs::StdRng;

/// What a worker was asked to do in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub range: Range<usize>,
    pub samples: Vec<usize>,
}

/// Adds one to every gradient entry per sample and remembers every pass it ran.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub seen: Arc<Mutex<Vec<Seen>>>,
    /// Fails the pass that touches this sample.
    pub fail_on: Option<usize>,
    /// Panics in the pass that touches this sample.
    pub panic_on: Option<usize>,
}

impl Recording {
    /// Every sample any pass touched, in the order the passes were recorded.
    pub fn in_order(&self) -> Vec<usize> {
        let seen = self.seen.lock();
        seen.iter().flat_map(|s| s.samples.clone()).collect()
    }

    /// Every sample any pass touched, sorted.
    pub fn samples(&self) -> Vec<usize> {
        let mut samples = self.in_order();
        samples.sort_unstable();
        samples
    }

    pub fn passes(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Kernel for Recording {
    fn replicate(&self, _topology: &Topology) -> Self {
        self.clone()
    }

    fn compute_gradient(
        &mut self,
        pass: &Pass<'_>,
        _rng: &mut StdRng,
        grad: &mut Matrices,
    ) -> Result<(), NumericErr> {
        let samples: Vec<_> = pass.sample_indices().collect();

        if let Some(sample) = self.panic_on.filter(|s| samples.contains(s)) {
            panic!("asked to panic on sample {sample}");
        }

        if let Some(sample) = self.fail_on.filter(|s| samples.contains(s)) {
            return Err(NumericErr::NonFinite { layer: 1, sample });
        }

        let count = samples.len() as f32;
        grad.iter_mut().for_each(|m| *m += count);

        self.seen.lock().push(Seen {
            range: pass.range.clone(),
            samples,
        });

        Ok(())
    }

    fn predict(&self, weights: &Matrices, _input: ArrayView1<f32>) -> Result<Array1<f32>, NumericErr> {
        Ok(Array1::zeros(weights[weights.len() - 1].nrows()))
    }
}

/// A dataset of `n` samples for a `[2, .., 1]` network.
pub fn dataset(n: usize) -> (Array2<f32>, Array2<f32>) {
    let inputs = Array2::from_shape_fn((n, 2), |(i, j)| ((i + j) % 3) as f32 / 2.);
    let targets = Array2::from_shape_fn((n, 1), |(i, _)| (i % 2) as f32);
    (inputs, targets)
}
