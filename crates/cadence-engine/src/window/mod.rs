//! Windowed host.
//!
//! Owns the `winit` EventLoop and Window and exposes them to runs as clock
//! adapters: redraws are frames, the loop's sleep points service idle
//! callbacks and fallback timers.

mod clock;
mod runtime;

pub use clock::WinitClock;
pub use runtime::{Runtime, RuntimeConfig};
