use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, HostCtx};

use super::clock::WinitClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// How often the loop wakes for idle callbacks when nothing else is due.
    pub idle_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cadence".to_string(),
            initial_size: LogicalSize::new(960.0, 540.0),
            idle_interval: Duration::from_millis(100),
        }
    }
}

/// Entry point for the windowed host.
pub struct Runtime;

impl Runtime {
    /// Runs the event loop until the app exits or the window closes.
    ///
    /// `clock` is the frame source runs started from `app` should use.
    pub fn run<A>(config: RuntimeConfig, clock: WinitClock, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, clock, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    clock: WinitClock,
    app: A,

    window: Option<Arc<Window>>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, clock: WinitClock, app: A) -> Self {
        Self {
            config,
            clock,
            app,
            window: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let window = Arc::new(window);

        self.clock.attach(window.clone());
        self.window = Some(window.clone());

        let ctx = HostCtx {
            window: &window,
            clock: &self.clock,
        };
        self.app.on_start(&ctx).context("app failed to start")
    }

    fn schedule_wake(&self, event_loop: &ActiveEventLoop) {
        let flow = match self.clock.next_wake(self.config.idle_interval) {
            Some(at) => ControlFlow::WaitUntil(at),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(flow);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to start host: {e:#}");
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        let Some(window) = self.window.clone() else {
            return;
        };

        self.clock.pump_background();

        let ctx = HostCtx {
            window: &window,
            clock: &self.clock,
        };
        if self.app.on_wake(&ctx) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        self.clock.request_redraw();
        self.schedule_wake(event_loop);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        let ctx = HostCtx {
            window: &window,
            clock: &self.clock,
        };
        if self.app.on_window_event(&ctx, &event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.clock.detach();
                self.window = None;
                self.request_exit(event_loop);
            }

            WindowEvent::Occluded(occluded) => self.clock.set_occluded(occluded),

            WindowEvent::RedrawRequested => {
                self.clock.pump_frames();
                window.pre_present_notify();
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.clock.detach();
        log::debug!("event loop exiting");
    }
}
