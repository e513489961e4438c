use std::rc::Rc;

use crate::clock::{FallbackTimer, FrameSource, IdleSource};

use super::completion::Completion;
use super::error::ScheduleError;
use super::frame::{Frame, Update};
use super::request::ScheduleRequest;
use super::run::{Hooks, Run, Sources, Stop};
use super::state::{Phase, RunState};

/// Builder wiring a run to its host.
///
/// ```rust,ignore
/// let clock = ManualClock::new();
/// let control = Scheduler::new(clock.clone())
///     .idle(clock.clone())
///     .fallback(clock.clone())
///     .start(ScheduleRequest::new(20.0).limit(5.0), |frame| {
///         log::info!("tick {}", frame.tick);
///         Ok(())
///     })?;
/// ```
pub struct Scheduler {
    frames: Rc<dyn FrameSource>,
    idle: Option<Rc<dyn IdleSource>>,
    fallback: Option<Rc<dyn FallbackTimer>>,
    hooks: Hooks,
}

impl Scheduler {
    pub fn new(frames: impl FrameSource + 'static) -> Self {
        Self {
            frames: Rc::new(frames),
            idle: None,
            fallback: None,
            hooks: Hooks::default(),
        }
    }

    /// Enables idle bookkeeping (`on_update`, stall detection).
    pub fn idle(mut self, idle: impl IdleSource + 'static) -> Self {
        self.idle = Some(Rc::new(idle));
        self
    }

    /// Timer that takes over when the frame source stalls.
    /// Only engaged if an idle source is also configured.
    pub fn fallback(mut self, timer: impl FallbackTimer + 'static) -> Self {
        self.fallback = Some(Rc::new(timer));
        self
    }

    /// Called from every idle callback.
    pub fn on_update(mut self, hook: impl FnMut(&Update) + 'static) -> Self {
        self.hooks.on_update = Some(Box::new(hook));
        self
    }

    /// Called before every fallback-driven tick.
    pub fn on_fallback(mut self, hook: impl FnMut(&Update) + 'static) -> Self {
        self.hooks.on_fallback = Some(Box::new(hook));
        self
    }

    /// Starts the run. The handler is first called once more than one
    /// interval has passed.
    pub fn start<H>(self, request: ScheduleRequest, handler: H) -> Result<Control, ScheduleError>
    where
        H: FnMut(&Frame) -> anyhow::Result<()> + 'static,
    {
        if !self.frames.is_available() {
            return Err(ScheduleError::ClockUnavailable);
        }

        let request = request.sanitized();
        let now = self.frames.now();
        let start = if request.high_resolution { now } else { now.floor() };
        let state = RunState::new(request, start);

        let (tx, request) = Completion::channel();
        let sources = Sources {
            frames: self.frames,
            idle: self.idle,
            fallback: self.fallback,
        };
        let run = Run::new(state, Box::new(handler), self.hooks, sources, tx);
        run.start();

        Ok(Control { request, run })
    }
}

/// Starts a run on `frames` with no idle bookkeeping.
pub fn request_animation_thread<F, H>(
    frames: F,
    request: ScheduleRequest,
    handler: H,
) -> Result<Control, ScheduleError>
where
    F: FrameSource + 'static,
    H: FnMut(&Frame) -> anyhow::Result<()> + 'static,
{
    Scheduler::new(frames).start(request, handler)
}

/// Handle to a running schedule.
///
/// Rate and speed changes take effect at the next clock frame. Once the run
/// has terminated every method is inert and the accessors report zero.
///
/// The handle owns the run. Dropping it while the run is still going cancels
/// everything it scheduled and resolves `request` as abandoned.
pub struct Control {
    /// Resolves with the final report when the run ends.
    pub request: Completion,
    run: Rc<Run>,
}

impl Control {
    /// Target rate most recently requested; 0 while paused.
    pub fn fps(&self) -> f64 {
        let state = self.run.state.borrow();
        if state.is_running() { state.target_rate() } else { 0.0 }
    }

    /// Milliseconds between ticks at the requested rate; 0 while paused.
    pub fn interval(&self) -> f64 {
        let state = self.run.state.borrow();
        if state.is_running() { state.target_interval() } else { 0.0 }
    }

    /// Retargets the rate; `0` pauses. Returns the resulting interval.
    pub fn throttle(&self, rate: f64) -> f64 {
        let mut state = self.run.state.borrow_mut();
        if !state.is_running() {
            return 0.0;
        }
        state.request_rate(rate)
    }

    pub fn pause(&self) -> f64 {
        self.throttle(0.0)
    }

    /// Resumes at `rate`, or at the last non-zero rate.
    pub fn resume(&self, rate: Option<f64>) -> f64 {
        let rate = match rate {
            Some(rate) => rate,
            None => self.run.state.borrow().resume_rate(),
        };
        self.throttle(rate)
    }

    /// Returns to the rate the run started with.
    pub fn restore(&self) -> f64 {
        let initial = self.run.state.borrow().initial_rate();
        self.throttle(initial)
    }

    /// Sets the speed multiplier. Invalid speeds reset to 1.
    pub fn accelerate(&self, speed: f64) -> f64 {
        let mut state = self.run.state.borrow_mut();
        if !state.is_running() {
            return 0.0;
        }
        state.request_speed(speed)
    }

    pub fn strict(&self) -> bool {
        self.run.state.borrow().is_strict()
    }

    /// Ends the run. Returns false if it had already ended.
    pub fn stop(&self) -> bool {
        self.run.stop()
    }

    /// A detachable stop capability for this run.
    pub fn stopper(&self) -> Stop {
        self.run.stopper()
    }

    pub fn is_running(&self) -> bool {
        self.run.state.borrow().is_running()
    }

    pub fn phase(&self) -> Phase {
        self.run.state.borrow().phase()
    }

    /// Handler invocations so far.
    pub fn tick(&self) -> u64 {
        self.run.state.borrow().tick()
    }
}
