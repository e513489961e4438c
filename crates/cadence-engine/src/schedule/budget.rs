/// Remaining-iteration countdown derived from a duration limit.
///
/// The countdown is expressed in ticks of `rate`. In strict mode a rate change
/// marks the budget dirty and the next [`settle`](Self::settle) rescales it so
/// the wall-clock duration of the limit is preserved. Non-strict budgets keep
/// their tick count no matter how the rate changes.
#[derive(Debug, Clone)]
pub struct IterationBudget {
    limit: Option<f64>,
    strict: bool,
    remaining: Option<u64>,
    /// Rate the countdown is currently expressed in.
    rate: f64,
    /// Rate change waiting to be folded into the countdown.
    retarget: Option<f64>,
}

impl IterationBudget {
    /// `limit` is in tocks; `None` never runs out.
    pub fn new(limit: Option<f64>, rate: f64, strict: bool) -> Self {
        Self {
            limit,
            strict,
            remaining: limit.map(|l| absolute(l, rate)),
            rate,
            retarget: None,
        }
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    pub fn is_unbounded(&self) -> bool {
        self.remaining.is_none()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Records a rate change. Pauses (`rate <= 0`) leave the budget alone.
    pub fn retarget(&mut self, rate: f64) {
        if rate <= 0.0 {
            return;
        }
        self.retarget = if rate == self.rate { None } else { Some(rate) };
    }

    /// Applies a recorded rate change once.
    pub fn settle(&mut self) {
        let Some(rate) = self.retarget.take() else {
            return;
        };

        if self.strict {
            if let (Some(remaining), Some(limit)) = (self.remaining, self.limit) {
                let scaled = (remaining as f64 * rate / self.rate).round();
                let cap = absolute(limit, rate);
                let rescaled = if scaled.is_finite() && scaled > 0.0 {
                    (scaled as u64).min(cap)
                } else {
                    0
                };
                log::debug!(
                    "strict budget rescaled {remaining} -> {rescaled} ({} -> {rate} fps)",
                    self.rate
                );
                self.remaining = Some(rescaled);
            }
        }
        self.rate = rate;
    }

    /// Counts one fired tick.
    pub fn consume(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    /// Ends the run at the next check.
    pub fn exhaust(&mut self) {
        self.remaining = Some(0);
    }
}

/// `floor(limit * rate)`, except that a product within rounding error of an
/// integer counts as that integer (`0.57 * 100.0` is 57 ticks, not 56).
fn absolute(limit: f64, rate: f64) -> u64 {
    let product = limit * rate;
    let nearest = product.round();
    let total = if (product - nearest).abs() <= 1e-9 * nearest.abs().max(1.0) {
        nearest
    } else {
        product.floor()
    };
    if total.is_finite() && total > 0.0 {
        total as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(b: &mut IterationBudget, n: u64) {
        for _ in 0..n {
            b.consume();
        }
    }

    // ── seeding ───────────────────────────────────────────────────────────

    #[test]
    fn seeded_from_limit_times_rate() {
        assert_eq!(IterationBudget::new(Some(5.0), 20.0, false).remaining(), Some(100));
        assert_eq!(IterationBudget::new(Some(2.5), 3.0, false).remaining(), Some(7));
        assert!(IterationBudget::new(Some(0.0), 30.0, false).is_exhausted());
        assert!(IterationBudget::new(None, 30.0, false).is_unbounded());
    }

    #[test]
    fn seeding_tolerates_float_error() {
        // 0.57 * 100.0 evaluates to 56.99999999999999.
        assert_eq!(IterationBudget::new(Some(0.57), 100.0, false).remaining(), Some(57));
        assert_eq!(IterationBudget::new(Some(0.29), 100.0, false).remaining(), Some(29));
        assert_eq!(IterationBudget::new(Some(0.999), 10.0, false).remaining(), Some(9));
    }

    #[test]
    fn consume_saturates_at_zero() {
        let mut b = IterationBudget::new(Some(0.1), 10.0, false);
        drain(&mut b, 5);
        assert_eq!(b.remaining(), Some(0));
    }

    #[test]
    fn unbounded_never_exhausts() {
        let mut b = IterationBudget::new(None, 60.0, true);
        drain(&mut b, 10_000);
        b.retarget(30.0);
        b.settle();
        assert!(!b.is_exhausted());
        assert_eq!(b.remaining(), None);
    }

    // ── retargeting ───────────────────────────────────────────────────────

    #[test]
    fn strict_rescales_to_preserve_duration() {
        let mut b = IterationBudget::new(Some(10.0), 10.0, true);
        drain(&mut b, 50);
        b.retarget(20.0);
        b.settle();
        assert_eq!(b.remaining(), Some(100));
    }

    #[test]
    fn strict_rescale_is_capped_by_absolute_budget() {
        // 3 ticks at 10 fps; at 5 fps the proportional 1.5 rounds up to 2,
        // but 0.35 tocks only hold 1 tick.
        let mut b = IterationBudget::new(Some(0.35), 10.0, true);
        assert_eq!(b.remaining(), Some(3));
        b.retarget(5.0);
        b.settle();
        assert_eq!(b.remaining(), Some(1));
    }

    #[test]
    fn strict_rescale_can_round_to_nothing() {
        let mut b = IterationBudget::new(Some(1.0), 30.0, true);
        drain(&mut b, 29);
        b.retarget(1.0);
        b.settle();
        assert!(b.is_exhausted());
    }

    #[test]
    fn strict_rescale_applies_once_per_change() {
        let mut b = IterationBudget::new(Some(10.0), 10.0, true);
        b.retarget(20.0);
        b.settle();
        b.settle();
        b.settle();
        assert_eq!(b.remaining(), Some(200));
    }

    #[test]
    fn pause_does_not_rescale() {
        let mut b = IterationBudget::new(Some(10.0), 10.0, true);
        drain(&mut b, 30);
        b.retarget(0.0);
        b.settle();
        assert_eq!(b.remaining(), Some(70));
        b.retarget(10.0);
        b.settle();
        assert_eq!(b.remaining(), Some(70));
    }

    #[test]
    fn non_strict_keeps_tick_count() {
        let mut b = IterationBudget::new(Some(10.0), 10.0, false);
        drain(&mut b, 50);
        b.retarget(20.0);
        b.settle();
        assert_eq!(b.remaining(), Some(50));
    }

    #[test]
    fn exhaust_forces_termination() {
        let mut b = IterationBudget::new(None, 30.0, false);
        b.exhaust();
        assert!(b.is_exhausted());
    }
}
