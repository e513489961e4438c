//! Clock adapters.
//!
//! The scheduler never reads time or sleeps on its own. It asks a host for
//! callbacks through the traits below:
//! - `FrameSource`: once per display refresh (the primary clock)
//! - `IdleSource`: whenever the host has nothing else to do
//! - `FallbackTimer`: fixed-period, low-resolution timer used when frames stall
//!
//! All callbacks run on the host's thread. Implementations hand out a fresh
//! `CallbackHandle` per request; cancelling an unknown or already-run handle
//! is a no-op.

mod manual;
mod queue;
mod timer_frames;
mod tokio_host;

pub use manual::ManualClock;
pub use queue::CallbackQueue;
pub use timer_frames::TimerFrames;
pub use tokio_host::TokioClock;

/// One-shot callback receiving the host timestamp in milliseconds.
pub type Callback = Box<dyn FnOnce(f64)>;

/// Repeating timer handler receiving the host timestamp in milliseconds.
pub type TimerHandler = Box<dyn FnMut(f64)>;

/// Identifies a pending callback or a running timer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CallbackHandle(pub(crate) u64);

/// Source of monotonic millisecond timestamps.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Per-refresh callback scheduling.
pub trait FrameSource: Clock {
    /// Schedules `callback` for the next frame.
    fn request_frame(&self, callback: Callback) -> CallbackHandle;

    fn cancel_frame(&self, handle: CallbackHandle);

    /// Whether this source can deliver frames at all in the current context.
    fn is_available(&self) -> bool {
        true
    }
}

/// Callbacks run when the host is otherwise idle.
pub trait IdleSource {
    fn request_idle(&self, callback: Callback) -> CallbackHandle;

    fn cancel_idle(&self, handle: CallbackHandle);
}

/// Fixed-period timer.
pub trait FallbackTimer: Clock {
    /// Starts calling `handler` every `period` milliseconds until stopped.
    fn start_timer(&self, period: f64, handler: TimerHandler) -> CallbackHandle;

    fn stop_timer(&self, handle: CallbackHandle);
}
