use std::time::{Duration, Instant};

/// Monotonic millisecond timestamps relative to a fixed origin.
///
/// Hosts use one `MonotonicClock` per run loop so every adapter they expose
/// (frames, idle, timers) reports timestamps on the same axis.
#[derive(Debug, Copy, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since the origin, with sub-millisecond precision.
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Converts a timestamp on this clock's axis back into an `Instant`.
    ///
    /// Negative and non-finite timestamps map to the origin.
    pub fn instant_at(&self, timestamp: f64) -> Instant {
        if !timestamp.is_finite() || timestamp <= 0.0 {
            return self.origin;
        }
        self.origin + Duration::from_secs_f64(timestamp / 1000.0)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_do_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn instant_at_round_trips_offsets() {
        let clock = MonotonicClock::new();
        let at = clock.instant_at(1500.0);
        assert_eq!(at.duration_since(clock.origin), Duration::from_millis(1500));
        assert_eq!(clock.instant_at(-3.0), clock.origin);
    }
}
