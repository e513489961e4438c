use crate::clock::CallbackHandle;
use crate::time::{normalize_rate, normalize_speed, rate_to_interval, DriftTracker};

use super::budget::IterationBudget;
use super::frame::{Frame, Report, Status, Termination, Update};
use super::request::ScheduleRequest;
use super::run::Stop;

/// Lifecycle of a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Running,
    Terminated,
}

/// Changes requested from outside the loop, applied at the next tick boundary.
#[derive(Debug, Default, Copy, Clone)]
struct Pending {
    rate: Option<f64>,
    speed: Option<f64>,
}

/// Host handles owned by a run.
#[derive(Debug, Default)]
pub(crate) struct Handles {
    pub frame: Option<CallbackHandle>,
    pub idle: Option<CallbackHandle>,
    pub fallback: Option<CallbackHandle>,
}

/// Outcome of one clock tick.
pub(crate) enum Advance {
    Skip,
    Exhausted,
    Fire(Frame),
}

/// Mutable state of one run.
///
/// Only the scheduler loop holds it mutably during a tick. Everything outside
/// the loop goes through the `request_*` methods, which write the pending slot.
pub(crate) struct RunState {
    request: ScheduleRequest,
    phase: Phase,

    current_rate: f64,
    /// Last non-zero rate before the current one.
    previous_rate: f64,
    interval: f64,
    speed: f64,
    pending: Pending,
    retargeted: bool,

    budget: IterationBudget,
    drift: DriftTracker,

    tick: u64,
    tock: u64,
    frame: u64,
    multiplier: f64,
    status: Status,

    timestamp: f64,
    previous_timestamp: f64,
    end: f64,
    last_frame_at: f64,

    handles: Handles,
}

impl RunState {
    /// `request` must already be sanitized.
    pub fn new(request: ScheduleRequest, start: f64) -> Self {
        let rate = request.rate;
        Self {
            phase: Phase::Idle,
            current_rate: rate,
            previous_rate: rate,
            interval: rate_to_interval(rate),
            speed: request.speed,
            pending: Pending::default(),
            retargeted: false,
            budget: IterationBudget::new(request.limit, rate, request.strict),
            drift: DriftTracker::new(start, request.high_resolution, request.drift),
            tick: 0,
            tock: 0,
            frame: 0,
            multiplier: 1.0,
            status: Status::Clean,
            timestamp: start,
            previous_timestamp: start,
            end: start,
            last_frame_at: start,
            handles: Handles::default(),
            request,
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    pub fn begin(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Running;
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Timestamps are floored to whole milliseconds unless high resolution is on.
    pub fn quantize(&self, now: f64) -> f64 {
        if self.request.high_resolution {
            now
        } else {
            now.floor()
        }
    }

    /// Marks the run terminated and hands back the handles to release.
    pub fn terminate(&mut self, now: f64, reason: Termination) -> (Report, Handles) {
        self.phase = Phase::Terminated;
        self.end = now;
        if matches!(reason, Termination::Fault(_)) {
            self.status = Status::Dirty;
        }
        let handles = std::mem::take(&mut self.handles);
        (self.report(reason), handles)
    }

    pub fn report(&self, termination: Termination) -> Report {
        Report {
            first: self.tick == 0,
            last: true,
            start: self.drift.start(),
            end: self.end,
            tick: self.tick,
            tock: self.tock,
            frame: self.frame,
            fps: self.current_rate,
            multiplier: self.multiplier,
            status: self.status,
            previous_timestamp: self.previous_timestamp,
            timestamp: self.timestamp,
            remaining: self.budget.remaining(),
            termination,
        }
    }

    // ── control surface ───────────────────────────────────────────────────

    /// Queues a rate change; `0` pauses. Returns the interval it will produce.
    pub fn request_rate(&mut self, rate: f64) -> f64 {
        let rate = if rate == 0.0 {
            0.0
        } else {
            if !rate.is_finite() || rate < 0.0 {
                log::warn!("invalid throttle rate {rate}; using default");
            }
            normalize_rate(rate)
        };
        self.pending.rate = Some(rate);
        interval_for(rate)
    }

    /// Queues a speed change. Returns the speed that will apply.
    pub fn request_speed(&mut self, speed: f64) -> f64 {
        let speed = normalize_speed(speed);
        self.pending.speed = Some(speed);
        speed
    }

    /// Most recently requested rate, pending or applied.
    pub fn target_rate(&self) -> f64 {
        self.pending.rate.unwrap_or(self.current_rate)
    }

    pub fn target_interval(&self) -> f64 {
        interval_for(self.target_rate())
    }

    /// Rate `resume()` returns to: the last non-zero rate.
    pub fn resume_rate(&self) -> f64 {
        let target = self.target_rate();
        if target > 0.0 {
            target
        } else if self.current_rate > 0.0 {
            self.current_rate
        } else {
            self.previous_rate
        }
    }

    pub fn initial_rate(&self) -> f64 {
        self.request.rate
    }

    pub fn is_strict(&self) -> bool {
        self.request.strict
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    // ── tick transition ───────────────────────────────────────────────────

    /// Records a clock frame. Only primary frames reset stall detection.
    pub fn observe_frame(&mut self, now: f64, fallback: bool) {
        self.frame += 1;
        if !fallback {
            self.last_frame_at = now;
        }
    }

    /// Applies queued rate and speed changes.
    pub fn apply_pending(&mut self, now: f64) {
        if let Some(speed) = self.pending.speed.take() {
            self.speed = speed;
        }

        let Some(rate) = self.pending.rate.take() else {
            return;
        };
        if rate == self.current_rate {
            return;
        }

        let was_paused = self.current_rate <= 0.0;
        if !was_paused {
            self.previous_rate = self.current_rate;
        }
        log::debug!("retargeting {} -> {rate} fps", self.current_rate);

        self.current_rate = rate;
        self.interval = interval_for(rate);
        self.budget.retarget(rate);
        self.retargeted = true;

        if rate > 0.0 && was_paused {
            self.drift.rebase(now);
        }
    }

    /// Decides fire-or-skip for one clock tick and updates counters on fire.
    pub fn advance(&mut self, now: f64, fallback: bool, stop: Stop) -> Advance {
        // A strict rescale may leave nothing to fire.
        self.budget.settle();
        if self.budget.is_exhausted() {
            return Advance::Exhausted;
        }

        let Some(sample) = self.drift.sample(now, self.interval, self.speed) else {
            return Advance::Skip;
        };

        self.budget.consume();

        self.tick += 1;
        self.tock = (self.tick as f64 / self.current_rate).round() as u64;
        self.multiplier = sample.multiplier;
        self.timestamp = sample.timestamp;
        self.previous_timestamp = sample.previous_timestamp;

        let status = if fallback || self.retargeted || sample.lag >= self.interval {
            Status::Dirty
        } else {
            Status::Clean
        };
        self.retargeted = false;
        if status == Status::Dirty {
            self.status = Status::Dirty;
        }

        Advance::Fire(Frame {
            tick: self.tick,
            tock: self.tock,
            timestamp: sample.timestamp,
            previous_timestamp: sample.previous_timestamp,
            delta: sample.elapsed,
            lag: sample.lag,
            multiplier: sample.multiplier,
            target_fps: self.current_rate,
            fps: 1000.0 / sample.elapsed,
            frame: self.frame,
            speed: self.speed,
            status,
            first: self.tick == 1,
            last: self.budget.is_exhausted(),
            stop,
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.budget.is_exhausted()
    }

    /// Treats a handler failure as reaching the end of the budget.
    pub fn fault(&mut self) {
        self.budget.exhaust();
        self.status = Status::Dirty;
    }

    // ── idle bookkeeping ──────────────────────────────────────────────────

    pub fn update(&self, now: f64, stop: Stop) -> Update {
        Update {
            tick: self.tick,
            tock: self.tock,
            previous_fps: self.previous_rate,
            previous_timestamp: self.previous_timestamp,
            timestamp: now,
            threshold: self.drift.threshold(),
            stop,
        }
    }

    /// No primary frame for longer than the stall threshold, and no fallback yet.
    pub fn is_stalled(&self, now: f64) -> bool {
        self.handles.fallback.is_none() && now - self.last_frame_at > self.request.stall_after
    }

    pub fn fallback_period(&self) -> f64 {
        self.request.fallback_period.unwrap_or_else(|| {
            if self.interval > 0.0 {
                self.interval
            } else {
                rate_to_interval(self.previous_rate)
            }
        })
    }

    // ── handles ───────────────────────────────────────────────────────────

    pub fn take_frame_handle(&mut self) -> Option<CallbackHandle> {
        self.handles.frame.take()
    }

    pub fn set_frame_handle(&mut self, handle: CallbackHandle) {
        self.handles.frame = Some(handle);
    }

    pub fn take_idle_handle(&mut self) -> Option<CallbackHandle> {
        self.handles.idle.take()
    }

    pub fn set_idle_handle(&mut self, handle: CallbackHandle) {
        self.handles.idle = Some(handle);
    }

    pub fn take_fallback_handle(&mut self) -> Option<CallbackHandle> {
        self.handles.fallback.take()
    }

    pub fn set_fallback_handle(&mut self, handle: CallbackHandle) {
        self.handles.fallback = Some(handle);
    }
}

fn interval_for(rate: f64) -> f64 {
    if rate > 0.0 {
        rate_to_interval(rate)
    } else {
        0.0
    }
}
