use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    Callback,
    CallbackHandle,
    CallbackQueue,
    Clock,
    FallbackTimer,
    FrameSource,
    IdleSource,
    TimerHandler,
};

struct Inner {
    queue: RefCell<CallbackQueue>,
    now: Cell<f64>,
    frames_suspended: Cell<bool>,
    available: bool,
}

/// Deterministic host whose time only moves when told to.
///
/// Cloning yields another handle to the same host. `advance` moves time
/// forward and then delivers, in order: pending frames (unless frames are
/// suspended), due timers, pending idle callbacks.
#[derive(Clone)]
pub struct ManualClock {
    inner: Rc<Inner>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::build(true)
    }

    /// A host without a frame primitive. `FrameSource::is_available` is false.
    pub fn unavailable() -> Self {
        Self::build(false)
    }

    fn build(available: bool) -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(CallbackQueue::new()),
                now: Cell::new(0.0),
                frames_suspended: Cell::new(false),
                available,
            }),
        }
    }

    /// Moves time forward by `ms` and delivers whatever became due.
    pub fn advance(&self, ms: f64) {
        let now = self.inner.now.get() + ms.max(0.0);
        self.inner.now.set(now);

        if !self.inner.frames_suspended.get() {
            CallbackQueue::run_frames(&self.inner.queue, now);
        }
        CallbackQueue::run_timers(&self.inner.queue, now);
        CallbackQueue::run_idle(&self.inner.queue, now);
    }

    /// Advances `count` times by `step` milliseconds.
    pub fn run_frames(&self, count: usize, step: f64) {
        for _ in 0..count {
            self.advance(step);
        }
    }

    /// Advances in `step` increments until `duration` milliseconds have passed.
    pub fn run_for(&self, duration: f64, step: f64) {
        let step = step.max(f64::EPSILON);
        let until = self.inner.now.get() + duration;
        while self.inner.now.get() + step <= until {
            self.advance(step);
        }
    }

    /// Stops (or resumes) frame delivery, as when a window is occluded.
    /// Timers and idle callbacks keep running.
    pub fn suspend_frames(&self, suspended: bool) {
        self.inner.frames_suspended.set(suspended);
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.queue.borrow().pending_frames()
    }

    pub fn pending_idle(&self) -> usize {
        self.inner.queue.borrow().pending_idle()
    }

    pub fn active_timers(&self) -> usize {
        self.inner.queue.borrow().active_timers()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.inner.now.get()
    }
}

impl FrameSource for ManualClock {
    fn request_frame(&self, callback: Callback) -> CallbackHandle {
        self.inner.queue.borrow_mut().push_frame(callback)
    }

    fn cancel_frame(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().cancel_frame(handle);
    }

    fn is_available(&self) -> bool {
        self.inner.available
    }
}

impl IdleSource for ManualClock {
    fn request_idle(&self, callback: Callback) -> CallbackHandle {
        self.inner.queue.borrow_mut().push_idle(callback)
    }

    fn cancel_idle(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().cancel_idle(handle);
    }
}

impl FallbackTimer for ManualClock {
    fn start_timer(&self, period: f64, handler: TimerHandler) -> CallbackHandle {
        let now = self.inner.now.get();
        self.inner.queue.borrow_mut().start_timer(now, period, handler)
    }

    fn stop_timer(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().stop_timer(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_delivers_frames_with_current_time() {
        let clock = ManualClock::new();
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        clock.request_frame(Box::new(move |now| s.set(now)));

        clock.advance(16.0);
        assert_eq!(seen.get(), 16.0);
        assert_eq!(clock.now(), 16.0);
        assert_eq!(clock.pending_frames(), 0);
    }

    #[test]
    fn suspended_frames_stay_pending() {
        let clock = ManualClock::new();
        clock.request_frame(Box::new(|_| {}));
        clock.suspend_frames(true);
        clock.run_frames(10, 16.0);
        assert_eq!(clock.pending_frames(), 1);

        clock.suspend_frames(false);
        clock.advance(16.0);
        assert_eq!(clock.pending_frames(), 0);
    }

    #[test]
    fn run_for_stops_at_duration() {
        let clock = ManualClock::new();
        clock.run_for(100.0, 10.0);
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    fn unavailable_clock_reports_it() {
        assert!(ManualClock::new().is_available());
        assert!(!ManualClock::unavailable().is_available());
    }
}
