//! Time source injected into the handler so timers can be driven in tests.

use std::cell::Cell;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Offsets are milliseconds from a fixed
/// origin captured at construction.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Moves to an absolute offset. Going backwards is ignored so the clock
    /// stays monotonic.
    pub fn set_ms(&self, ms: u64) {
        let target = Duration::from_millis(ms);
        if target > self.offset.get() {
            self.offset.set(target);
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.offset.get().as_millis() as u64
    }

    /// Instant corresponding to `ms` after the origin.
    pub fn at_ms(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        clock.set_ms(250);
        assert_eq!(clock.now() - clock.origin(), Duration::from_millis(250));

        clock.set_ms(100);
        assert_eq!(clock.elapsed_ms(), 250);

        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.now(), clock.at_ms(300));
    }
}
