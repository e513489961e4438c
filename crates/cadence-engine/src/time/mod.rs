//! Time subsystem.
//!
//! Pure timing arithmetic used by the scheduler, kept free of any clock source:
//! - `rate` converts between ticks per second and millisecond intervals
//! - `drift` measures each clock tick against the nominal interval
//! - `MonotonicClock` gives hosts a shared millisecond axis

mod drift;
mod monotonic;
mod rate;

pub use drift::{DriftPolicy, DriftSample, DriftTracker};
pub use monotonic::MonotonicClock;
pub use rate::{
    interval_to_rate,
    normalize_rate,
    normalize_speed,
    rate_to_interval,
    DEFAULT_RATE,
    DEFAULT_SPEED,
};
