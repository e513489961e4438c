use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use cadence_engine::core::{App, AppControl, HostCtx};
use cadence_engine::logging::{init_logging, LoggingConfig};
use cadence_engine::window::{Runtime, RuntimeConfig, WinitClock};
use cadence_engine::{Control, Frame, ScheduleRequest, Scheduler, Status};

const USAGE: &str = "usage: cadence-studio [rate] [limit-seconds] [--strict]";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let request = parse_args(std::env::args().skip(1))?;
    log::info!(
        "space: pause/resume  r: restore  +/-: throttle  s: speed  esc: stop"
    );

    let clock = WinitClock::new();
    let studio = Studio::new(request);

    Runtime::run(
        RuntimeConfig {
            title: "cadence studio".to_string(),
            ..RuntimeConfig::default()
        },
        clock,
        studio,
    )
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<ScheduleRequest> {
    let mut request = ScheduleRequest::new(30.0);
    let mut positional = 0;

    for arg in args {
        if arg == "--strict" {
            request = request.strict(true);
            continue;
        }
        let value: f64 = arg
            .parse()
            .with_context(|| format!("invalid argument {arg:?}; {USAGE}"))?;
        match positional {
            0 => request.rate = value,
            1 => request = request.limit(value),
            _ => anyhow::bail!("too many arguments; {USAGE}"),
        }
        positional += 1;
    }
    Ok(request)
}

/// What the handler last saw, read back when the title is refreshed.
#[derive(Default)]
struct Stats {
    tick: u64,
    tock: u64,
    fps: f64,
    target_fps: f64,
    speed: f64,
    status: Status,
}

impl Stats {
    fn record(&mut self, frame: &Frame) {
        self.tick = frame.tick;
        self.tock = frame.tock;
        self.fps = frame.fps;
        self.target_fps = frame.target_fps;
        self.speed = frame.speed;
        self.status = frame.status;
    }
}

struct Studio {
    request: ScheduleRequest,
    control: Option<Control>,
    stats: Rc<RefCell<Stats>>,
}

impl Studio {
    fn new(request: ScheduleRequest) -> Self {
        Self {
            request,
            control: None,
            stats: Rc::new(RefCell::new(Stats::default())),
        }
    }

    fn title(&self, ctx: &HostCtx<'_>) -> String {
        let stats = self.stats.borrow();
        let paused = self.control.as_ref().is_some_and(|c| c.fps() == 0.0);
        let state = if paused {
            "paused"
        } else if ctx.is_occluded() {
            "occluded"
        } else {
            "running"
        };
        format!(
            "cadence studio | {state} | {:.1}/{} fps x{} | tick {} tock {} | {:?}",
            stats.fps, stats.target_fps, stats.speed, stats.tick, stats.tock, stats.status
        )
    }

    fn on_key(&mut self, key: KeyCode) -> AppControl {
        let Some(control) = self.control.as_ref() else {
            return AppControl::Continue;
        };

        match key {
            KeyCode::Space if control.fps() == 0.0 => {
                control.resume(None);
            }
            KeyCode::Space => {
                control.pause();
            }
            KeyCode::KeyR => {
                control.restore();
            }
            KeyCode::Equal | KeyCode::NumpadAdd => {
                control.throttle(control.fps() + 5.0);
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                control.throttle((control.fps() - 5.0).max(1.0));
            }
            KeyCode::KeyS => {
                let speed = self.stats.borrow().speed;
                control.accelerate(if speed > 1.0 { 1.0 } else { 2.0 });
            }
            KeyCode::Escape => {
                control.stop();
            }
            _ => {}
        }
        AppControl::Continue
    }
}

impl App for Studio {
    fn on_start(&mut self, ctx: &HostCtx<'_>) -> Result<()> {
        let clock = ctx.clock.clone();
        let stats = self.stats.clone();

        let control = Scheduler::new(clock.clone())
            .idle(clock.clone())
            .fallback(clock)
            .on_update(|update| {
                log::trace!("idle at tick {} (threshold {:.2})", update.tick, update.threshold);
            })
            .on_fallback(|update| {
                log::debug!("fallback tick at {:.0} ms", update.timestamp);
            })
            .start(self.request.clone(), move |frame| {
                stats.borrow_mut().record(frame);
                if frame.last {
                    log::info!("last tick {} at {:.0} ms", frame.tick, frame.timestamp);
                }
                Ok(())
            })
            .context("failed to start run")?;

        self.control = Some(control);
        Ok(())
    }

    fn on_window_event(&mut self, _ctx: &HostCtx<'_>, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(code) => self.on_key(code),
                    PhysicalKey::Unidentified(_) => AppControl::Continue,
                }
            }
            _ => AppControl::Continue,
        }
    }

    fn on_wake(&mut self, ctx: &HostCtx<'_>) -> AppControl {
        ctx.set_title(&self.title(ctx));

        let Some(control) = self.control.as_ref() else {
            return AppControl::Continue;
        };
        let Some(report) = control.request.try_report() else {
            return AppControl::Continue;
        };

        log::info!(
            "run ended ({}): {} ticks, {} tocks over {:.0} ms, {:?}",
            report.termination,
            report.tick,
            report.tock,
            report.duration(),
            report.status
        );
        AppControl::Exit
    }
}
