/// Rate used when a caller supplies a missing or invalid rate.
pub const DEFAULT_RATE: f64 = 30.0;

/// Speed used when a caller supplies an invalid speed multiplier.
pub const DEFAULT_SPEED: f64 = 1.0;

/// Clamps a target rate (ticks per second) to the value used for bookkeeping.
///
/// Positive rates are floored and kept at or above one tick per second.
/// Zero, negative and non-finite rates degrade to [`DEFAULT_RATE`].
pub fn normalize_rate(rate: f64) -> f64 {
    if !rate.is_finite() || rate <= 0.0 {
        return DEFAULT_RATE;
    }
    rate.floor().max(1.0)
}

/// Maps a target rate to the spacing between ticks, in milliseconds.
pub fn rate_to_interval(rate: f64) -> f64 {
    1000.0 / normalize_rate(rate)
}

/// Inverse of [`rate_to_interval`]. Diagnostic only.
///
/// A zero interval is the paused encoding and maps to a rate of zero.
pub fn interval_to_rate(interval: f64) -> f64 {
    if !interval.is_finite() || interval <= 0.0 {
        return 0.0;
    }
    1000.0 / interval
}

/// Speed multipliers must be finite and positive; anything else resets to 1.
pub fn normalize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        DEFAULT_SPEED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── rate_to_interval ──────────────────────────────────────────────────

    #[test]
    fn interval_for_whole_rates() {
        for r in 1..=240 {
            let r = r as f64;
            assert_eq!(rate_to_interval(r), 1000.0 / r);
        }
    }

    #[test]
    fn fractional_rates_are_floored() {
        assert_eq!(rate_to_interval(29.9), 1000.0 / 29.0);
        assert_eq!(rate_to_interval(0.5), 1000.0);
    }

    #[test]
    fn invalid_rates_use_default() {
        let fallback = 1000.0 / DEFAULT_RATE;
        assert_eq!(rate_to_interval(0.0), fallback);
        assert_eq!(rate_to_interval(-12.0), fallback);
        assert_eq!(rate_to_interval(f64::NAN), fallback);
        assert_eq!(rate_to_interval(f64::INFINITY), fallback);
    }

    // ── interval_to_rate ──────────────────────────────────────────────────

    #[test]
    fn inverse_round_trips_within_rounding() {
        for r in [1.0, 10.0, 24.0, 30.0, 60.0, 144.0] {
            let back = interval_to_rate(rate_to_interval(r));
            assert!((back - r).abs() < 1e-9, "{r} -> {back}");
        }
    }

    #[test]
    fn paused_interval_maps_to_zero_rate() {
        assert_eq!(interval_to_rate(0.0), 0.0);
        assert_eq!(interval_to_rate(-5.0), 0.0);
    }

    // ── normalize_speed ───────────────────────────────────────────────────

    #[test]
    fn speed_resets_when_invalid() {
        assert_eq!(normalize_speed(2.5), 2.5);
        assert_eq!(normalize_speed(0.0), DEFAULT_SPEED);
        assert_eq!(normalize_speed(-1.0), DEFAULT_SPEED);
        assert_eq!(normalize_speed(f64::NAN), DEFAULT_SPEED);
    }
}
