//! Injected monotonic time source
//!
//! Every interval-sensitive component (position rate limiting, render
//! coalescing, intent trailing windows) reads time through this trait
//! instead of calling `Instant::now()` directly, so tests can drive time
//! deterministically with a manual clock.

use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source
pub trait Clock {
    /// Current monotonic instant
    fn now(&self) -> Instant;
}

/// Shared handle to the session's clock
pub type SharedClock = Rc<dyn Clock>;

/// Real wall clock backed by `Instant::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
