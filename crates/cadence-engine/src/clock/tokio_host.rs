use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

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
use crate::time::rate_to_interval;

/// Headless host driven by a tokio current-thread runtime.
///
/// Frames are delivered at `refresh_rate` while [`TokioClock::drive`] is being
/// awaited; timers and idle callbacks are serviced after each frame. Timestamps
/// come from `tokio::time`, so paused test runtimes advance them deterministically.
#[derive(Clone)]
pub struct TokioClock {
    queue: Rc<RefCell<CallbackQueue>>,
    origin: Instant,
    refresh: Duration,
}

impl TokioClock {
    /// Creates a host refreshing at `refresh_rate` frames per second.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(refresh_rate: f64) -> Self {
        Self {
            queue: Rc::new(RefCell::new(CallbackQueue::new())),
            origin: Instant::now(),
            refresh: Duration::from_secs_f64(rate_to_interval(refresh_rate) / 1000.0),
        }
    }

    pub fn refresh(&self) -> Duration {
        self.refresh
    }

    pub fn pending_frames(&self) -> usize {
        self.queue.borrow().pending_frames()
    }

    /// Pumps frames until `until` resolves, then returns its output.
    pub async fn drive<F: Future>(&self, until: F) -> F::Output {
        let mut ticker = tokio::time::interval(self.refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(until);

        loop {
            tokio::select! {
                biased;

                out = &mut until => return out,
                _ = ticker.tick() => self.pump(),
            }
        }
    }

    fn pump(&self) {
        let now = self.now();
        CallbackQueue::run_frames(&self.queue, now);
        CallbackQueue::run_timers(&self.queue, now);
        CallbackQueue::run_idle(&self.queue, now);
    }
}

impl Clock for TokioClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl FrameSource for TokioClock {
    fn request_frame(&self, callback: Callback) -> CallbackHandle {
        self.queue.borrow_mut().push_frame(callback)
    }

    fn cancel_frame(&self, handle: CallbackHandle) {
        self.queue.borrow_mut().cancel_frame(handle);
    }
}

impl IdleSource for TokioClock {
    fn request_idle(&self, callback: Callback) -> CallbackHandle {
        self.queue.borrow_mut().push_idle(callback)
    }

    fn cancel_idle(&self, handle: CallbackHandle) {
        self.queue.borrow_mut().cancel_idle(handle);
    }
}

impl FallbackTimer for TokioClock {
    fn start_timer(&self, period: f64, handler: TimerHandler) -> CallbackHandle {
        let now = self.now();
        self.queue.borrow_mut().start_timer(now, period, handler)
    }

    fn stop_timer(&self, handle: CallbackHandle) {
        self.queue.borrow_mut().stop_timer(handle);
    }
}
