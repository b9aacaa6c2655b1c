//! Counting semaphore that bounds frames in flight.
//!
//! The render thread takes a [`FramePermit`] before encoding a frame and
//! hands it to the GPU completion callback, which drops it once the GPU has
//! finished the frame's work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct LimiterState {
    capacity: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
}

impl LimiterState {
    fn release(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        self.released.notify_one();
    }
}

/// Bounds how many frames may be submitted but not yet completed.
#[derive(Clone)]
pub struct FrameLimiter {
    state: Arc<LimiterState>,
}

/// One frame's claim on the limiter. Released on drop.
#[must_use = "dropping the permit immediately releases the frame slot"]
pub struct FramePermit {
    state: Arc<LimiterState>,
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.state.release();
    }
}

impl std::fmt::Debug for FramePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePermit").finish_non_exhaustive()
    }
}

impl FrameLimiter {
    /// Limiter admitting `capacity` frames at once (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(LimiterState {
                capacity: capacity.max(1),
                in_flight: Mutex::new(0),
                released: Condvar::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    pub fn in_flight(&self) -> usize {
        *self.state.in_flight.lock()
    }

    fn permit(&self) -> FramePermit {
        FramePermit {
            state: Arc::clone(&self.state),
        }
    }

    /// Block until a slot is free.
    pub fn acquire(&self) -> FramePermit {
        let mut in_flight = self.state.in_flight.lock();
        while *in_flight >= self.state.capacity {
            self.state.released.wait(&mut in_flight);
        }
        *in_flight += 1;
        drop(in_flight);
        self.permit()
    }

    pub fn try_acquire(&self) -> Option<FramePermit> {
        let mut in_flight = self.state.in_flight.lock();
        if *in_flight >= self.state.capacity {
            return None;
        }
        *in_flight += 1;
        drop(in_flight);
        Some(self.permit())
    }

    /// Block for at most `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<FramePermit> {
        let deadline = Instant::now() + timeout;
        let mut in_flight = self.state.in_flight.lock();
        while *in_flight >= self.state.capacity {
            if self
                .state
                .released
                .wait_until(&mut in_flight, deadline)
                .timed_out()
            {
                if *in_flight >= self.state.capacity {
                    return None;
                }
                break;
            }
        }
        *in_flight += 1;
        drop(in_flight);
        Some(self.permit())
    }
}
