//! Scheduler subsystem.
//!
//! Turns an irregular host frame clock into handler calls at a target rate:
//! - `Scheduler` wires a run to its clock adapters and starts it
//! - `Control` is the external surface for a running loop (throttle, pause, stop)
//! - `IterationBudget` turns a duration limit into a tick countdown
//! - `Completion` resolves once with the final `Report`
//!
//! Runs are single-threaded. Every callback, including the handler, runs on
//! the thread that drives the clock.

mod budget;
mod completion;
mod control;
mod error;
mod frame;
mod request;
mod run;
mod state;

pub use budget::IterationBudget;
pub use completion::Completion;
pub use control::{request_animation_thread, Control, Scheduler};
pub use error::ScheduleError;
pub use frame::{Frame, Report, Status, Termination, Update};
pub use request::{ScheduleRequest, DEFAULT_STALL_AFTER};
pub use run::Stop;
pub use state::Phase;
