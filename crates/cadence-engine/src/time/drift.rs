/// How overshoot is carried from one firing to the next.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DriftPolicy {
    /// At most one interval of accumulated lag is consumed per firing; the
    /// remainder (capped at one interval) carries into the next firing.
    #[default]
    Partial,
    /// Every firing starts from zero lag.
    Reset,
}

/// Timing for one firing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DriftSample {
    /// Milliseconds since the previous firing (or since start).
    pub elapsed: f64,
    /// Overshoot beyond the nominal interval, including carried lag.
    pub lag: f64,
    /// Nominal ticks this firing represents, scaled by speed.
    pub multiplier: f64,
    pub previous_timestamp: f64,
    pub timestamp: f64,
}

/// Tracks drift between real elapsed time and the nominal tick interval.
///
/// After every firing the carried lag stays within `[0, interval]` and the
/// threshold within `[-interval, interval]`.
#[derive(Debug, Clone)]
pub struct DriftTracker {
    policy: DriftPolicy,
    high_resolution: bool,
    start: f64,
    previous: f64,
    lag: f64,
    threshold: f64,
}

impl DriftTracker {
    pub fn new(start: f64, high_resolution: bool, policy: DriftPolicy) -> Self {
        Self {
            policy,
            high_resolution,
            start,
            previous: start,
            lag: 0.0,
            threshold: 0.0,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// Timestamp the next elapsed measurement is taken from.
    pub fn previous_timestamp(&self) -> f64 {
        self.previous
    }

    /// Lag carried into the next firing.
    pub fn lag(&self) -> f64 {
        self.lag
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Measures one clock tick against `interval`.
    ///
    /// Returns `None` when paused (`interval <= 0`) or when not enough time
    /// has passed. Nothing is accumulated in that case.
    pub fn sample(&mut self, now: f64, interval: f64, speed: f64) -> Option<DriftSample> {
        if interval <= 0.0 {
            return None;
        }

        let elapsed = now - self.previous;
        if elapsed <= interval {
            return None;
        }

        let overshoot = elapsed - interval;
        let lag = match self.policy {
            DriftPolicy::Partial => self.lag + overshoot,
            DriftPolicy::Reset => overshoot,
        };

        let consumed = lag.min(interval);
        let multiplier = (1.0 + consumed / interval) * speed;

        self.lag = match self.policy {
            DriftPolicy::Partial => (lag - consumed).min(interval),
            DriftPolicy::Reset => 0.0,
        };
        self.threshold = (self.threshold + overshoot).clamp(-interval, interval);

        let previous = self.previous;
        self.previous = if self.high_resolution {
            now
        } else {
            // Snap back to the interval grid so the cadence does not slip by
            // one clock frame per firing.
            now - elapsed % interval
        };

        Some(DriftSample {
            elapsed,
            lag,
            multiplier,
            previous_timestamp: previous,
            timestamp: now,
        })
    }

    /// Restarts measurement at `now`, discarding accumulated drift.
    ///
    /// Used when resuming from a pause so the paused span is not reported as lag.
    pub fn rebase(&mut self, now: f64) {
        self.previous = now;
        self.lag = 0.0;
        self.threshold = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(high_resolution: bool) -> DriftTracker {
        DriftTracker::new(0.0, high_resolution, DriftPolicy::Partial)
    }

    // ── fire / skip ───────────────────────────────────────────────────────

    #[test]
    fn skips_until_interval_exceeded() {
        let mut d = tracker(true);
        assert!(d.sample(50.0, 100.0, 1.0).is_none());
        assert!(d.sample(100.0, 100.0, 1.0).is_none());
        let s = d.sample(101.0, 100.0, 1.0).unwrap();
        assert_eq!(s.elapsed, 101.0);
        assert_eq!(s.previous_timestamp, 0.0);
        assert_eq!(s.timestamp, 101.0);
    }

    #[test]
    fn paused_never_fires() {
        let mut d = tracker(true);
        assert!(d.sample(10_000.0, 0.0, 1.0).is_none());
        assert_eq!(d.previous_timestamp(), 0.0);
    }

    // ── previous timestamp policy ─────────────────────────────────────────

    #[test]
    fn high_resolution_tracks_raw_timestamp() {
        let mut d = tracker(true);
        d.sample(130.0, 100.0, 1.0).unwrap();
        assert_eq!(d.previous_timestamp(), 130.0);
    }

    #[test]
    fn low_resolution_snaps_to_interval_grid() {
        let mut d = tracker(false);
        d.sample(130.0, 100.0, 1.0).unwrap();
        assert_eq!(d.previous_timestamp(), 100.0);
    }

    #[test]
    fn low_resolution_keeps_cadence_with_coarse_frames() {
        // 10 ms frames against a 50 ms interval fire every 50 ms.
        let mut d = tracker(false);
        let mut fired = Vec::new();
        let mut now = 0.0;
        while now < 300.0 {
            now += 10.0;
            if d.sample(now, 50.0, 1.0).is_some() {
                fired.push(now);
            }
        }
        assert_eq!(fired, vec![60.0, 110.0, 160.0, 210.0, 260.0]);
    }

    // ── lag accounting ────────────────────────────────────────────────────

    #[test]
    fn small_overshoot_reports_fractional_multiplier() {
        let mut d = tracker(true);
        let s = d.sample(125.0, 100.0, 1.0).unwrap();
        assert_eq!(s.lag, 25.0);
        assert_eq!(s.multiplier, 1.25);
        // Overshoot below one interval is fully consumed.
        assert_eq!(d.lag(), 0.0);
    }

    #[test]
    fn large_overshoot_is_amortized() {
        let mut d = tracker(true);
        let s = d.sample(350.0, 100.0, 1.0).unwrap();
        assert_eq!(s.lag, 250.0);
        assert_eq!(s.multiplier, 2.0);
        // 150 left over, capped at one interval.
        assert_eq!(d.lag(), 100.0);

        let s = d.sample(460.0, 100.0, 1.0).unwrap();
        assert_eq!(s.lag, 110.0);
        assert_eq!(s.multiplier, 2.0);
        assert_eq!(d.lag(), 10.0);
    }

    #[test]
    fn lag_stays_within_one_interval() {
        let mut d = tracker(true);
        let mut now = 0.0;
        for step in [120.0, 480.0, 101.0, 999.0, 105.0, 250.0] {
            now += step;
            d.sample(now, 100.0, 1.0);
            assert!(d.lag() >= 0.0 && d.lag() <= 100.0, "lag {}", d.lag());
            assert!(d.threshold().abs() <= 100.0, "threshold {}", d.threshold());
        }
    }

    #[test]
    fn reset_policy_drops_carried_lag() {
        let mut d = DriftTracker::new(0.0, true, DriftPolicy::Reset);
        d.sample(350.0, 100.0, 1.0).unwrap();
        assert_eq!(d.lag(), 0.0);
        let s = d.sample(460.0, 100.0, 1.0).unwrap();
        assert_eq!(s.lag, 10.0);
    }

    #[test]
    fn speed_scales_multiplier() {
        let mut d = tracker(true);
        let s = d.sample(150.0, 100.0, 2.0).unwrap();
        assert_eq!(s.multiplier, 3.0);
    }

    // ── rebase ────────────────────────────────────────────────────────────

    #[test]
    fn rebase_discards_paused_span() {
        let mut d = tracker(true);
        d.sample(350.0, 100.0, 1.0).unwrap();
        d.rebase(5_000.0);
        assert_eq!(d.lag(), 0.0);
        assert_eq!(d.threshold(), 0.0);
        assert!(d.sample(5_050.0, 100.0, 1.0).is_none());
        let s = d.sample(5_101.0, 100.0, 1.0).unwrap();
        assert_eq!(s.elapsed, 101.0);
    }
}
