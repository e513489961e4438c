use std::fmt;

/// Errors surfaced when starting a run.
///
/// Invalid configuration is never an error: it is recovered with defaults.
/// Handler failures end the run and are reported through its completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The frame source cannot deliver frames in this context. Start the run
    /// on a [`TimerFrames`](crate::clock::TimerFrames) source instead.
    ClockUnavailable,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::ClockUnavailable => {
                f.write_str("frame clock unavailable; select a fallback timer source")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}
