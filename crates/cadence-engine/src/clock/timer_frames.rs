use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{Callback, CallbackHandle, CallbackQueue, Clock, FallbackTimer, FrameSource};

struct Inner<T> {
    timer: T,
    period: f64,
    queue: RefCell<CallbackQueue>,
    running: Cell<Option<CallbackHandle>>,
}

/// A `FrameSource` emulated with a fixed-period timer.
///
/// For hosts that have no frame primitive at all: frames are delivered on the
/// timer's period instead of the display refresh. The timer only runs while
/// at least one frame is pending.
pub struct TimerFrames<T: FallbackTimer + 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: FallbackTimer + 'static> TimerFrames<T> {
    pub fn new(timer: T, period: f64) -> Self {
        Self {
            inner: Rc::new(Inner {
                timer,
                period,
                queue: RefCell::new(CallbackQueue::new()),
                running: Cell::new(None),
            }),
        }
    }

    pub fn period(&self) -> f64 {
        self.inner.period
    }

    fn ensure_running(&self) {
        if self.inner.running.get().is_some() {
            return;
        }

        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        let handle = self.inner.timer.start_timer(
            self.inner.period,
            Box::new(move |now| {
                if let Some(inner) = weak.upgrade() {
                    inner.deliver(now);
                }
            }),
        );
        self.inner.running.set(Some(handle));
    }
}

impl<T: FallbackTimer> Inner<T> {
    fn deliver(&self, now: f64) {
        CallbackQueue::run_frames(&self.queue, now);
        self.stop_if_idle();
    }

    fn stop_if_idle(&self) {
        if self.queue.borrow().pending_frames() > 0 {
            return;
        }
        if let Some(handle) = self.running.take() {
            self.timer.stop_timer(handle);
        }
    }
}

impl<T: FallbackTimer + 'static> Clone for TimerFrames<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: FallbackTimer + 'static> Clock for TimerFrames<T> {
    fn now(&self) -> f64 {
        self.inner.timer.now()
    }
}

impl<T: FallbackTimer + 'static> FrameSource for TimerFrames<T> {
    fn request_frame(&self, callback: Callback) -> CallbackHandle {
        let handle = self.inner.queue.borrow_mut().push_frame(callback);
        self.ensure_running();
        handle
    }

    fn cancel_frame(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().cancel_frame(handle);
        self.inner.stop_if_idle();
    }
}
