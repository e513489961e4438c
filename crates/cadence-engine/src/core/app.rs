use winit::event::WindowEvent;

use super::ctx::HostCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by hosts of a scheduled run.
///
/// The runtime owns the event loop and the frame clock; the app owns its
/// runs and their `Control` handles.
pub trait App {
    /// Called once the window exists. Start runs here.
    fn on_start(&mut self, ctx: &HostCtx<'_>) -> anyhow::Result<()>;

    /// Called for window events, before the runtime handles them.
    fn on_window_event(&mut self, ctx: &HostCtx<'_>, event: &WindowEvent) -> AppControl {
        let _ = (ctx, event);
        AppControl::Continue
    }

    /// Called every time the loop is about to sleep, after timers and idle
    /// callbacks were serviced.
    fn on_wake(&mut self, ctx: &HostCtx<'_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }
}
