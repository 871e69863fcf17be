//! Time sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::sampling::sample::Ticks;

/// A monotonic clock.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Ticks;
}

impl<F> Clock for F
where
    F: Fn() -> Ticks,
{
    fn now(&self) -> Ticks {
        self()
    }
}

/// Nanoseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock starting at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Ticks {
        Ticks(self.origin.elapsed().as_nanos() as u64)
    }
}

/// A clock that only moves when told to. Useful for replaying event logs.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    /// Create a clock at `start`.
    pub fn new(start: Ticks) -> Self {
        Self {
            ticks: AtomicU64::new(start.0),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Ticks {
        Ticks(self.ticks.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Ticks(5));
        clock.advance(10);
        assert_eq!(clock.now(), Ticks(15));
    }
}
