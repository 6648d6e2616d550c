//! Injected tick clock.
//!
//! Everything time-driven in the engine — reel spins, tweens, service
//! latency, phase pauses — reads this clock instead of the wall clock, so
//! tests can advance virtual time as fast as they like without changing any
//! sequencing.

use serde::{Deserialize, Serialize};

/// A virtual clock advanced explicitly by the engine's owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickClock {
    now_ms: u64,
    ticks: u64,
}

impl TickClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of ticks taken so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances the clock by one tick of `dt_ms` milliseconds.
    pub fn advance(&mut self, dt_ms: u64) {
        self.now_ms += dt_ms;
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = TickClock::new();
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn advance_accumulates() {
        let mut clock = TickClock::new();
        clock.advance(16);
        clock.advance(16);
        clock.advance(100);
        assert_eq!(clock.now_ms(), 132);
        assert_eq!(clock.ticks(), 3);
    }
}
