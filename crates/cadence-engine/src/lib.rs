//! Cadence engine crate.
//!
//! Adaptive frame-rate scheduling: a handler runs at a target rate on top of
//! whatever frame clock the host provides, with drift compensation, duration
//! limits, live retargeting and a fallback timer for stalled clocks.

pub mod clock;
pub mod core;
pub mod logging;
pub mod schedule;
pub mod time;
pub mod window;

pub use schedule::{
    request_animation_thread,
    Completion,
    Control,
    Frame,
    Report,
    ScheduleError,
    ScheduleRequest,
    Scheduler,
    Status,
    Termination,
};
