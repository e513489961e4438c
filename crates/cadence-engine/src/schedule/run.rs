use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;

use crate::clock::{FallbackTimer, FrameSource, IdleSource};

use super::frame::{Frame, Report, Termination, Update};
use super::state::{Advance, Handles, RunState};

pub(crate) type Handler = Box<dyn FnMut(&Frame) -> anyhow::Result<()>>;
pub(crate) type Hook = Box<dyn FnMut(&Update)>;

/// Optional callbacks driven by idle bookkeeping.
#[derive(Default)]
pub(crate) struct Hooks {
    pub on_update: Option<Hook>,
    pub on_fallback: Option<Hook>,
}

#[derive(Copy, Clone)]
enum HookKind {
    Update,
    Fallback,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Update => f.write_str("update hook"),
            HookKind::Fallback => f.write_str("fallback hook"),
        }
    }
}

/// Host adapters a run schedules itself on.
pub(crate) struct Sources {
    pub frames: Rc<dyn FrameSource>,
    pub idle: Option<Rc<dyn IdleSource>>,
    pub fallback: Option<Rc<dyn FallbackTimer>>,
}

/// The scheduler loop for one run.
///
/// Host callbacks only hold the run weakly; its `Control` owns it. Dropping
/// that handle before the run terminates releases every host handle and
/// resolves the completion as abandoned.
pub(crate) struct Run {
    pub(crate) state: RefCell<RunState>,
    handler: RefCell<Handler>,
    hooks: RefCell<Hooks>,
    sources: Sources,
    completion: RefCell<Option<oneshot::Sender<Report>>>,
}

/// Capability that terminates the run it was issued by.
///
/// Calling it more than once, or after the run ended, does nothing.
#[derive(Clone)]
pub struct Stop {
    run: Weak<Run>,
}

impl Stop {
    /// Returns true if this call ended the run.
    pub fn stop(&self) -> bool {
        match self.run.upgrade() {
            Some(run) => run.stop(),
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { run: Weak::new() }
    }
}

impl fmt::Debug for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stop")
            .field("attached", &(self.run.strong_count() > 0))
            .finish()
    }
}

impl Run {
    pub(crate) fn new(
        state: RunState,
        handler: Handler,
        hooks: Hooks,
        sources: Sources,
        completion: oneshot::Sender<Report>,
    ) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            handler: RefCell::new(handler),
            hooks: RefCell::new(hooks),
            sources,
            completion: RefCell::new(Some(completion)),
        })
    }

    pub(crate) fn stopper(self: &Rc<Self>) -> Stop {
        Stop {
            run: Rc::downgrade(self),
        }
    }

    /// Idle → Running: subscribes to the frame clock (and idle source).
    pub(crate) fn start(self: &Rc<Self>) {
        self.state.borrow_mut().begin();
        log::debug!(
            "run started at {} fps",
            self.state.borrow().target_rate()
        );
        self.reschedule();
        self.schedule_idle();
    }

    pub(crate) fn stop(self: &Rc<Self>) -> bool {
        let now = self.sources.frames.now();
        self.finish(now, Termination::Stopped)
    }

    // ── clock callbacks ───────────────────────────────────────────────────

    fn on_frame(self: &Rc<Self>, now: f64) {
        let fallback = {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            state.take_frame_handle();
            state.take_fallback_handle()
        };

        if let (Some(handle), Some(timer)) = (fallback, self.sources.fallback.as_ref()) {
            log::debug!("frame clock resumed; stopping fallback timer");
            timer.stop_timer(handle);
        }

        self.step(now, false);
    }

    fn on_fallback_timer(self: &Rc<Self>, now: f64) {
        let update = {
            let state = self.state.borrow();
            if !state.is_running() {
                return;
            }
            state.update(state.quantize(now), self.stopper())
        };
        if let Err(msg) = self.call_hook(HookKind::Fallback, &update) {
            self.fail(now, HookKind::Fallback, msg);
            return;
        }
        self.step(now, true);
    }

    fn on_idle(self: &Rc<Self>, now: f64) {
        let update = {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            state.take_idle_handle();
            state.update(state.quantize(now), self.stopper())
        };

        if let Err(msg) = self.call_hook(HookKind::Update, &update) {
            self.fail(now, HookKind::Update, msg);
            return;
        }

        let stalled = {
            let state = self.state.borrow();
            state.is_running() && state.is_stalled(state.quantize(now))
        };
        if stalled {
            self.engage_fallback();
        }
        self.schedule_idle();
    }

    // ── transitions ───────────────────────────────────────────────────────

    fn step(self: &Rc<Self>, now: f64, fallback: bool) {
        // Held from before the counters move until the handler returns, so a
        // nested pump cannot fire a tick the handler never sees.
        let Ok(mut handler) = self.handler.try_borrow_mut() else {
            log::warn!("frame handler re-entered; deferring tick");
            self.reschedule();
            return;
        };

        let (now, advance) = {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            let now = state.quantize(now);
            state.observe_frame(now, fallback);
            state.apply_pending(now);
            (now, state.advance(now, fallback, self.stopper()))
        };

        let frame = match advance {
            Advance::Skip => {
                drop(handler);
                self.reschedule();
                return;
            }
            Advance::Exhausted => {
                drop(handler);
                self.finish(now, Termination::Exhausted);
                return;
            }
            Advance::Fire(frame) => frame,
        };

        let result = invoke(&mut handler, &frame);
        drop(handler);

        if let Err(msg) = result {
            log::error!("frame handler failed on tick {}: {msg}", frame.tick);
            self.fault(now, msg);
            return;
        }

        let exhausted = self.state.borrow().is_exhausted();
        if exhausted {
            self.finish(now, Termination::Exhausted);
        } else {
            self.reschedule();
        }
    }

    fn fail(&self, now: f64, kind: HookKind, msg: String) {
        log::error!("{kind} failed: {msg}");
        self.fault(now, msg);
    }

    fn fault(&self, now: f64, msg: String) {
        {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            state.fault();
        }
        self.finish(now, Termination::Fault(msg));
    }

    /// Running → Terminated. Returns false if the run had already ended.
    fn finish(&self, now: f64, reason: Termination) -> bool {
        let (report, handles) = {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return false;
            }
            let now = state.quantize(now);
            state.terminate(now, reason)
        };

        self.release(handles);
        log::info!(
            "run finished after {} ticks ({}): {}",
            report.tick,
            report.tock,
            report.termination
        );

        if let Some(tx) = self.completion.borrow_mut().take() {
            let _ = tx.send(report);
        }
        true
    }

    fn release(&self, handles: Handles) {
        if let Some(handle) = handles.frame {
            self.sources.frames.cancel_frame(handle);
        }
        if let (Some(handle), Some(idle)) = (handles.idle, self.sources.idle.as_ref()) {
            idle.cancel_idle(handle);
        }
        if let (Some(handle), Some(timer)) = (handles.fallback, self.sources.fallback.as_ref()) {
            timer.stop_timer(handle);
        }
    }

    // ── scheduling ────────────────────────────────────────────────────────

    /// Cancels the outstanding frame request, if any, and requests the next one.
    fn reschedule(self: &Rc<Self>) {
        let stale = {
            let mut state = self.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            state.take_frame_handle()
        };
        if let Some(handle) = stale {
            self.sources.frames.cancel_frame(handle);
        }

        let callback = weak_callback(Rc::downgrade(self), Run::on_frame);
        let handle = self.sources.frames.request_frame(Box::new(callback));
        self.state.borrow_mut().set_frame_handle(handle);
    }

    fn schedule_idle(self: &Rc<Self>) {
        let Some(idle) = self.sources.idle.as_ref() else {
            return;
        };
        if !self.state.borrow().is_running() {
            return;
        }

        let callback = weak_callback(Rc::downgrade(self), Run::on_idle);
        let handle = idle.request_idle(Box::new(callback));
        self.state.borrow_mut().set_idle_handle(handle);
    }

    fn engage_fallback(self: &Rc<Self>) {
        let Some(timer) = self.sources.fallback.as_ref() else {
            return;
        };
        let period = {
            let state = self.state.borrow();
            if !state.is_running() || !state.is_stalled(self.sources.frames.now()) {
                return;
            }
            state.fallback_period()
        };

        log::warn!("frame clock stalled; falling back to a {period:.1} ms timer");
        let callback = weak_callback(Rc::downgrade(self), Run::on_fallback_timer);
        let handle = timer.start_timer(period, Box::new(callback));
        self.state.borrow_mut().set_fallback_handle(handle);
    }

    /// Runs a hook with no state borrowed. A panic comes back as its message.
    fn call_hook(&self, kind: HookKind, update: &Update) -> Result<(), String> {
        let Ok(mut hooks) = self.hooks.try_borrow_mut() else {
            return Ok(());
        };
        let hook = match kind {
            HookKind::Update => hooks.on_update.as_mut(),
            HookKind::Fallback => hooks.on_fallback.as_mut(),
        };
        let Some(hook) = hook else {
            return Ok(());
        };

        panic::catch_unwind(AssertUnwindSafe(|| (**hook)(update)))
            .map_err(|payload| panic_message(payload.as_ref()))
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        let Some(tx) = self.completion.get_mut().take() else {
            return;
        };
        log::warn!("run dropped before terminating");

        let now = self.sources.frames.now();
        let state = self.state.get_mut();
        let now = state.quantize(now);
        let (report, handles) = state.terminate(now, Termination::Abandoned);
        self.release(handles);
        let _ = tx.send(report);
    }
}

/// Host callback that reaches the run only while something else keeps it alive.
fn weak_callback(run: Weak<Run>, on: fn(&Rc<Run>, f64)) -> impl FnMut(f64) + 'static {
    move |now| {
        if let Some(run) = run.upgrade() {
            on(&run, now);
        }
    }
}

/// Calls the handler, turning an error or a panic into a message.
fn invoke(handler: &mut Handler, frame: &Frame) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| (**handler)(frame))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::clock::ManualClock;
    use crate::schedule::{Completion, ScheduleRequest};

    fn build_run(clock: &ManualClock, handler: Handler) -> (Rc<Run>, Completion) {
        let request = ScheduleRequest::new(10.0).sanitized();
        let (tx, completion) = Completion::channel();
        let sources = Sources {
            frames: Rc::new(clock.clone()),
            idle: None,
            fallback: None,
        };
        let run = Run::new(RunState::new(request, 0.0), handler, Hooks::default(), sources, tx);
        (run, completion)
    }

    fn idle_run(clock: &ManualClock) -> (Rc<Run>, Completion) {
        build_run(clock, Box::new(|_: &Frame| -> anyhow::Result<()> { Ok(()) }))
    }

    #[test]
    fn dropped_run_resolves_as_abandoned() {
        let clock = ManualClock::new();
        let (run, completion) = idle_run(&clock);
        drop(run);

        let report = completion.try_report().unwrap();
        assert_eq!(report.termination, Termination::Abandoned);
        assert_eq!(report.tick, 0);
    }

    #[test]
    fn stop_handle_outlives_run() {
        let clock = ManualClock::new();
        let (run, _completion) = idle_run(&clock);
        let stop = run.stopper();
        drop(run);
        assert!(!stop.stop());
        assert!(format!("{stop:?}").contains("attached: false"));
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let clock = ManualClock::new();
        let (run, completion) = idle_run(&clock);
        assert!(!run.stop());
        assert!(completion.try_report().is_none());

        run.start();
        assert_eq!(clock.pending_frames(), 1);
        assert!(run.stop());
        assert_eq!(clock.pending_frames(), 0);
        assert_eq!(completion.try_report().unwrap().termination, Termination::Stopped);
    }

    #[test]
    fn nested_tick_waits_for_the_running_handler() {
        let clock = ManualClock::new();
        let slot: Rc<RefCell<Weak<Run>>> = Rc::new(RefCell::new(Weak::new()));
        let calls = Rc::new(Cell::new(0u64));

        let (s, c) = (slot.clone(), calls.clone());
        let handler: Handler = Box::new(move |f: &Frame| {
            c.set(c.get() + 1);
            // Far enough ahead that the tick would fire if it were allowed to.
            if let Some(run) = s.borrow().upgrade() {
                run.step(f.timestamp + 1_000.0, true);
            }
            Ok(())
        });
        let (run, _completion) = build_run(&clock, handler);
        *slot.borrow_mut() = Rc::downgrade(&run);

        run.start();
        clock.run_for(1_000.0, 10.0);

        assert!(calls.get() > 0);
        assert_eq!(run.state.borrow().tick(), calls.get());
        assert_eq!(clock.pending_frames(), 1);
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(&"bad"), "panicked: bad");
        assert_eq!(panic_message(&String::from("worse")), "panicked: worse");
        assert_eq!(panic_message(&42u8), "panicked");
    }
}
