use std::fmt;

use super::run::Stop;

/// Whether firings have kept to the nominal one-tick-per-interval cadence.
///
/// Observability only; never affects scheduling.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Status {
    #[default]
    Clean,
    Dirty,
}

/// Why a run ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Termination {
    /// The iteration budget ran out.
    Exhausted,
    /// `stop` was called.
    Stopped,
    /// The handler returned an error or panicked.
    Fault(String),
    /// The run's `Control` was dropped before it terminated.
    #[default]
    Abandoned,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("budget exhausted"),
            Termination::Stopped => f.write_str("stopped"),
            Termination::Fault(msg) => write!(f, "handler fault: {msg}"),
            Termination::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Payload passed to the handler on every fired tick.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Fired ticks so far, this one included (1 on the first call).
    pub tick: u64,
    /// `round(tick / target_fps)`.
    pub tock: u64,
    pub timestamp: f64,
    pub previous_timestamp: f64,
    /// Milliseconds since the previous firing.
    pub delta: f64,
    pub lag: f64,
    pub multiplier: f64,
    pub target_fps: f64,
    /// Measured rate of this firing, `1000 / delta`.
    pub fps: f64,
    /// Clock frames observed so far, fired or not.
    pub frame: u64,
    pub speed: f64,
    pub status: Status,
    pub first: bool,
    /// No further call follows unless the run is retargeted in strict mode.
    pub last: bool,
    pub stop: Stop,
}

/// Payload passed to idle and fallback hooks.
#[derive(Debug, Clone)]
pub struct Update {
    pub tick: u64,
    pub tock: u64,
    /// Last non-zero target rate.
    pub previous_fps: f64,
    pub previous_timestamp: f64,
    pub timestamp: f64,
    pub threshold: f64,
    pub stop: Stop,
}

/// Final statistics delivered through the completion signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// True when the run ended before the handler ever fired.
    pub first: bool,
    pub last: bool,
    pub start: f64,
    pub end: f64,
    pub tick: u64,
    pub tock: u64,
    pub frame: u64,
    /// Target rate in effect at termination (0 if paused).
    pub fps: f64,
    pub multiplier: f64,
    pub status: Status,
    pub previous_timestamp: f64,
    pub timestamp: f64,
    /// Iterations left; `None` for unbounded runs.
    pub remaining: Option<u64>,
    pub termination: Termination,
}

impl Report {
    /// Stand-in for a run whose state could not be read at all.
    pub(crate) fn abandoned() -> Self {
        Self {
            first: true,
            last: true,
            status: Status::Dirty,
            termination: Termination::Abandoned,
            ..Self::default()
        }
    }

    /// Wall-clock length of the run in milliseconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
