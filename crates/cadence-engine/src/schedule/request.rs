use crate::time::{normalize_rate, normalize_speed, DriftPolicy, DEFAULT_RATE};

/// Idle time without a primary frame before the fallback timer takes over.
pub const DEFAULT_STALL_AFTER: f64 = 1000.0;

/// Per-run configuration.
///
/// Built once with the consuming setters below and frozen when the run starts.
/// Invalid values are not rejected here; they are recovered with defaults
/// when the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    /// Target ticks per second.
    pub rate: f64,

    /// Run length in tocks (seconds at the initial rate). `None` runs until stopped.
    pub limit: Option<f64>,

    /// Preserve wall-clock duration instead of tick count when the rate changes.
    pub strict: bool,

    /// Initial speed multiplier applied to each firing's multiplier.
    pub speed: f64,

    /// Use raw timestamps. When false, timestamps are floored to whole
    /// milliseconds and firings snap to the interval grid.
    pub high_resolution: bool,

    pub drift: DriftPolicy,

    /// Milliseconds without a primary frame after which idle bookkeeping
    /// engages the fallback timer.
    pub stall_after: f64,

    /// Fallback timer period in milliseconds. `None` uses the interval in
    /// effect when the fallback engages.
    pub fallback_period: Option<f64>,
}

impl ScheduleRequest {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    pub fn limit(mut self, tocks: f64) -> Self {
        self.limit = Some(tocks);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn high_resolution(mut self, high_resolution: bool) -> Self {
        self.high_resolution = high_resolution;
        self
    }

    pub fn drift(mut self, policy: DriftPolicy) -> Self {
        self.drift = policy;
        self
    }

    pub fn stall_after(mut self, ms: f64) -> Self {
        self.stall_after = ms;
        self
    }

    pub fn fallback_period(mut self, ms: f64) -> Self {
        self.fallback_period = Some(ms);
        self
    }

    /// Returns a copy with every field brought into its valid range.
    pub(crate) fn sanitized(&self) -> Self {
        let mut out = self.clone();

        if !self.rate.is_finite() || self.rate <= 0.0 {
            log::warn!("invalid rate {}; using {DEFAULT_RATE}", self.rate);
        }
        out.rate = normalize_rate(self.rate);

        out.limit = match self.limit {
            Some(l) if l.is_nan() || l < 0.0 => {
                log::warn!("invalid limit {l}; running unbounded");
                None
            }
            Some(l) if l.is_infinite() => None,
            other => other,
        };

        if normalize_speed(self.speed) != self.speed {
            log::warn!("invalid speed {}; using 1", self.speed);
        }
        out.speed = normalize_speed(self.speed);

        if !self.stall_after.is_finite() || self.stall_after <= 0.0 {
            out.stall_after = DEFAULT_STALL_AFTER;
        }
        out.fallback_period = self
            .fallback_period
            .filter(|p| p.is_finite() && *p > 0.0);

        out
    }
}

impl Default for ScheduleRequest {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            limit: None,
            strict: false,
            speed: 1.0,
            high_resolution: false,
            drift: DriftPolicy::Partial,
            stall_after: DEFAULT_STALL_AFTER,
            fallback_period: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let r = ScheduleRequest::new(20.0)
            .limit(5.0)
            .strict(true)
            .speed(2.0)
            .high_resolution(true)
            .drift(DriftPolicy::Reset)
            .stall_after(500.0)
            .fallback_period(250.0);

        assert_eq!(r.rate, 20.0);
        assert_eq!(r.limit, Some(5.0));
        assert!(r.strict);
        assert_eq!(r.speed, 2.0);
        assert!(r.high_resolution);
        assert_eq!(r.drift, DriftPolicy::Reset);
        assert_eq!(r.stall_after, 500.0);
        assert_eq!(r.fallback_period, Some(250.0));
    }

    #[test]
    fn sanitized_recovers_invalid_values() {
        let r = ScheduleRequest::new(-4.0)
            .limit(f64::NAN)
            .speed(0.0)
            .stall_after(-1.0)
            .fallback_period(0.0)
            .sanitized();

        assert_eq!(r.rate, DEFAULT_RATE);
        assert_eq!(r.limit, None);
        assert_eq!(r.speed, 1.0);
        assert_eq!(r.stall_after, DEFAULT_STALL_AFTER);
        assert_eq!(r.fallback_period, None);
    }

    #[test]
    fn sanitized_floors_rate_and_drops_infinite_limit() {
        let r = ScheduleRequest::new(24.7).limit(f64::INFINITY).sanitized();
        assert_eq!(r.rate, 24.0);
        assert_eq!(r.limit, None);
    }
}
