use winit::window::{Window, WindowId};

use crate::window::WinitClock;

/// Handles passed to every `core::App` callback.
pub struct HostCtx<'a> {
    pub window: &'a Window,
    pub clock: &'a WinitClock,
}

impl<'a> HostCtx<'a> {
    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Whether the window is currently hidden and receiving no frames.
    pub fn is_occluded(&self) -> bool {
        self.clock.is_occluded()
    }
}
