use std::thread;
use std::time::Duration;

/// Runs one step per item, strictly one at a time, pausing after each.
///
/// The step is an `FnMut` driven from a single loop, so at most one species is
/// in flight and the step may hold exclusive borrows (the assessment cache)
/// without locking. The pause bounds the request rate towards both upstream
/// services and applies after failed items too.
#[derive(Debug, Clone, Copy)]
pub struct SequentialScheduler {
    pacing: Duration,
}

impl SequentialScheduler {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Results come back in input order, one per item.
    pub fn run<T, U, F>(&self, items: &[T], mut step: F) -> Vec<U>
    where
        F: FnMut(usize, &T) -> U,
    {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            results.push(step(index, item));
            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }
        results
    }
}
