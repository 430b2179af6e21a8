use std::ops::Range;

use crate::config::RemainderPolicy;

/// Iterates the `[start, end)` windows that cover `n` positions in steps of `batch_size`.
///
/// # Panics
/// If `batch_size` is zero.
pub fn batch_windows(n: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    (0..n)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(n))
}

/// Splits a batch window into one contiguous range per worker.
///
/// The ranges are pairwise disjoint, ordered and contained in `window`; some of them may
/// be empty.
///
/// # Arguments
/// * `window` - The positions of the index vector this batch covers.
/// * `threads` - The amount of workers, must be positive.
/// * `batch_size` - The nominal size of a batch.
/// * `policy` - What to do with the positions `batch_size / threads` leaves over.
pub fn partition(
    window: Range<usize>,
    threads: usize,
    batch_size: usize,
    policy: RemainderPolicy,
) -> Vec<Range<usize>> {
    let Range { start, end } = window;

    match policy {
        RemainderPolicy::Truncate => {
            let per_thread = batch_size / threads;
            (0..threads)
                .map(|t| {
                    let lo = (start + t * per_thread).min(end);
                    let hi = (start + (t + 1) * per_thread).min(end);
                    lo..hi
                })
                .collect()
        }
        RemainderPolicy::Spread => {
            let len = end - start;
            let base = len / threads;
            let extra = len % threads;

            let mut lo = start;
            (0..threads)
                .map(|t| {
                    let hi = lo + base + usize::from(t < extra);
                    let range = lo..hi;
                    lo = hi;
                    range
                })
                .collect()
        }
    }
}
