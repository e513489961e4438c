//! Core host-facing contracts.
//!
//! This module defines the interface between the windowed runtime and the
//! application that drives runs on it.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::HostCtx;
