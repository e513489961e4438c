use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::window::Window;

use crate::clock::{
    Callback,
    CallbackHandle,
    CallbackQueue,
    Clock,
    FallbackTimer,
    FrameSource,
    IdleSource,
    TimerHandler,
};
use crate::time::MonotonicClock;

struct Inner {
    queue: RefCell<CallbackQueue>,
    clock: MonotonicClock,
    window: RefCell<Option<Arc<Window>>>,
    occluded: Cell<bool>,
}

/// Clock adapters backed by a winit window.
///
/// Frames are `RedrawRequested` events: requesting a frame asks the window for
/// a redraw, and the runtime delivers pending frames when it arrives. Timers
/// and idle callbacks are serviced each time the event loop is about to sleep.
///
/// An occluded window gets no redraws, so frames stall until it is visible
/// again. That is what the fallback timer is for.
#[derive(Clone)]
pub struct WinitClock {
    inner: Rc<Inner>,
}

impl WinitClock {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(CallbackQueue::new()),
                clock: MonotonicClock::new(),
                window: RefCell::new(None),
                occluded: Cell::new(false),
            }),
        }
    }

    pub(crate) fn attach(&self, window: Arc<Window>) {
        *self.inner.window.borrow_mut() = Some(window);
        self.request_redraw();
    }

    pub(crate) fn detach(&self) {
        self.inner.window.borrow_mut().take();
    }

    pub(crate) fn set_occluded(&self, occluded: bool) {
        if self.inner.occluded.replace(occluded) != occluded {
            log::debug!("window occluded: {occluded}");
        }
        self.request_redraw();
    }

    pub fn is_occluded(&self) -> bool {
        self.inner.occluded.get()
    }

    /// Asks the window for a redraw if a frame is pending and it is visible.
    pub(crate) fn request_redraw(&self) {
        if self.inner.occluded.get() || self.pending_frames() == 0 {
            return;
        }
        if let Some(window) = self.inner.window.borrow().as_ref() {
            window.request_redraw();
        }
    }

    /// Delivers pending frames. Called on `RedrawRequested`.
    pub(crate) fn pump_frames(&self) -> usize {
        CallbackQueue::run_frames(&self.inner.queue, self.now())
    }

    /// Fires due timers, then idle callbacks.
    pub(crate) fn pump_background(&self) -> usize {
        let now = self.now();
        CallbackQueue::run_timers(&self.inner.queue, now)
            + CallbackQueue::run_idle(&self.inner.queue, now)
    }

    /// When the event loop must wake up on its own.
    ///
    /// `None` means only window events need to wake it.
    pub(crate) fn next_wake(&self, idle_interval: Duration) -> Option<Instant> {
        let queue = self.inner.queue.borrow();
        let idle = (queue.pending_idle() > 0)
            .then(|| self.now() + idle_interval.as_secs_f64() * 1000.0);

        let due = match (queue.next_timer_due(), idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }?;
        Some(self.inner.clock.instant_at(due))
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

impl Default for WinitClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WinitClock {
    fn now(&self) -> f64 {
        self.inner.clock.now()
    }
}

impl FrameSource for WinitClock {
    fn request_frame(&self, callback: Callback) -> CallbackHandle {
        let handle = self.inner.queue.borrow_mut().push_frame(callback);
        self.request_redraw();
        handle
    }

    fn cancel_frame(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().cancel_frame(handle);
    }
}

impl IdleSource for WinitClock {
    fn request_idle(&self, callback: Callback) -> CallbackHandle {
        self.inner.queue.borrow_mut().push_idle(callback)
    }

    fn cancel_idle(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().cancel_idle(handle);
    }
}

impl FallbackTimer for WinitClock {
    fn start_timer(&self, period: f64, handler: TimerHandler) -> CallbackHandle {
        let now = self.now();
        self.inner.queue.borrow_mut().start_timer(now, period, handler)
    }

    fn stop_timer(&self, handle: CallbackHandle) {
        self.inner.queue.borrow_mut().stop_timer(handle);
    }
}
