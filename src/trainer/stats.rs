use std::ops::Range;

/// What a single batch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    /// The positions of the index vector the batch covered.
    pub window: Range<usize>,
    /// The range handed to each worker, in worker order.
    pub ranges: Vec<Range<usize>>,
}

impl BatchRecord {
    /// The amount of positions some worker processed.
    pub fn assigned(&self) -> usize {
        self.ranges.iter().map(ExactSizeIterator::len).sum()
    }

    /// The amount of positions of the window no worker processed.
    pub fn dropped(&self) -> usize {
        self.window.len() - self.assigned()
    }
}

/// A summary of a `train` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainStats {
    /// The amount of weight updates applied.
    pub updates: usize,
    pub assigned: usize,
    pub dropped: usize,
    pub batches: Vec<BatchRecord>,
}

impl TrainStats {
    pub(super) fn record(&mut self, batch: BatchRecord) {
        self.updates += 1;
        self.assigned += batch.assigned();
        self.dropped += batch.dropped();
        self.batches.push(batch);
    }
}
