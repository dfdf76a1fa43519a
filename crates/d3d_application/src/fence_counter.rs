//! CPU/GPU synchronization through a monotonically increasing fence value.
//!
//! The GPU executes submitted work asynchronously. Any CPU-side reuse of
//! something the GPU may still read (the command allocator, a swap chain
//! buffer, a resource about to be dropped) must be preceded by a wait proving
//! that the work touching it has retired. [`FenceCounter::flush`] is the
//! blunt version of that proof, [`FenceCounter::retire`] the precise one.

use tracing::trace;

use crate::error::AppResult;

/// A backend fence bound to the submission queue.
pub trait GpuFence {
    /// Enqueues an instruction for the GPU to set the fence to `value` once
    /// it reaches this point in the command stream.
    fn signal(&mut self, value: u64) -> AppResult<()>;
    /// The value the GPU has most recently completed.
    fn completed_value(&self) -> u64;
    /// Blocks the calling thread until `completed_value() >= value`.
    /// There is no timeout.
    fn wait_for(&mut self, value: u64) -> AppResult<()>;
}

#[derive(Debug)]
pub struct FenceCounter<F> {
    fence: F,
    current_value: u64,
}

impl<F: GpuFence> FenceCounter<F> {
    pub fn new(fence: F) -> Self {
        Self {
            fence,
            current_value: 0,
        }
    }

    /// The last value signalled into the queue.
    pub fn current_value(&self) -> u64 {
        self.current_value
    }

    pub fn completed_value(&self) -> u64 {
        self.fence.completed_value()
    }

    pub fn fence(&self) -> &F {
        &self.fence
    }

    /// Marks a frame boundary and returns its value.
    pub fn signal_next(&mut self) -> AppResult<u64> {
        let value = self.current_value + 1;
        self.fence.signal(value)?;
        self.current_value = value;
        Ok(value)
    }

    pub fn wait_until(&mut self, value: u64) -> AppResult<()> {
        let completed = self.fence.completed_value();
        if completed >= value {
            return Ok(());
        }
        trace!(value, completed, "Waiting on fence");
        self.fence.wait_for(value)
    }

    /// Waits until everything submitted so far has completed.
    pub fn flush(&mut self) -> AppResult<()> {
        let value = self.signal_next()?;
        self.wait_until(value)
    }

    /// Waits until work submitted while the counter stood at `after` has
    /// retired, signalling a new boundary only if none has been queued
    /// behind that work yet.
    pub fn retire(&mut self, after: u64) -> AppResult<()> {
        if self.fence.completed_value() > after {
            return Ok(());
        }
        if self.current_value > after {
            self.wait_until(after + 1)
        } else {
            self.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Signals queue up and only complete when something waits on them.
    #[derive(Default)]
    struct LazyFence {
        queued: VecDeque<u64>,
        completed: u64,
        waits: u32,
    }

    impl GpuFence for LazyFence {
        fn signal(&mut self, value: u64) -> AppResult<()> {
            self.queued.push_back(value);
            Ok(())
        }

        fn completed_value(&self) -> u64 {
            self.completed
        }

        fn wait_for(&mut self, value: u64) -> AppResult<()> {
            self.waits += 1;
            while self.completed < value {
                let next = self.queued.pop_front().expect("wait on a value never signalled");
                self.completed = next;
            }
            Ok(())
        }
    }

    #[test]
    fn signal_next_increments_by_one() {
        let mut counter = FenceCounter::new(LazyFence::default());
        let values: Vec<u64> = (0..5).map(|_| counter.signal_next().unwrap()).collect();
        assert_eq!(values, [1, 2, 3, 4, 5]);
        assert_eq!(counter.current_value(), 5);
        assert_eq!(counter.fence().queued, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn wait_until_skips_blocking_once_reached() {
        let mut counter = FenceCounter::new(LazyFence::default());
        counter.signal_next().unwrap();
        counter.signal_next().unwrap();
        counter.wait_until(2).unwrap();
        assert_eq!(counter.fence().waits, 1);

        counter.wait_until(1).unwrap();
        counter.wait_until(2).unwrap();
        assert_eq!(counter.fence().waits, 1);
    }

    #[test]
    fn flush_is_repeatable() {
        let mut counter = FenceCounter::new(LazyFence::default());
        for expected in 1..=3 {
            counter.flush().unwrap();
            assert_eq!(counter.current_value(), expected);
            assert_eq!(counter.completed_value(), expected);
        }
        assert!(counter.fence().queued.is_empty());
    }

    #[test]
    fn retire_reuses_an_already_queued_signal() {
        let mut counter = FenceCounter::new(LazyFence::default());
        counter.signal_next().unwrap(); // work submitted at 0 is behind signal 1
        counter.signal_next().unwrap();
        counter.retire(0).unwrap();
        assert_eq!(counter.current_value(), 2);
        assert_eq!(counter.completed_value(), 1);
    }

    #[test]
    fn retire_flushes_when_nothing_is_queued_behind() {
        let mut counter = FenceCounter::new(LazyFence::default());
        counter.retire(0).unwrap();
        assert_eq!(counter.current_value(), 1);
        assert_eq!(counter.completed_value(), 1);

        counter.retire(0).unwrap();
        assert_eq!(counter.current_value(), 1);
    }
}
