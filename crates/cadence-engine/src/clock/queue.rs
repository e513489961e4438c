use std::cell::RefCell;

use super::{Callback, CallbackHandle, TimerHandler};

type Entry = (CallbackHandle, Callback);

struct Timer {
    handle: CallbackHandle,
    period: f64,
    due: f64,
    /// `None` while the handler is running.
    handler: Option<TimerHandler>,
}

/// Pending frame/idle callbacks and periodic timers for one host.
///
/// Hosts keep the queue in a `RefCell` and drain it with the `run_*`
/// functions. Draining never holds the borrow while a callback runs, so
/// callbacks may schedule or cancel freely. A callback cancelled by an
/// earlier callback in the same drain does not run; callbacks scheduled
/// during a drain wait for the next one.
#[derive(Default)]
pub struct CallbackQueue {
    next_id: u64,
    frames: Vec<Entry>,
    idle: Vec<Entry>,
    timers: Vec<Timer>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> CallbackHandle {
        self.next_id += 1;
        CallbackHandle(self.next_id)
    }

    pub fn push_frame(&mut self, callback: Callback) -> CallbackHandle {
        let handle = self.next_handle();
        self.frames.push((handle, callback));
        handle
    }

    pub fn cancel_frame(&mut self, handle: CallbackHandle) -> bool {
        take_entry(&mut self.frames, handle).is_some()
    }

    pub fn push_idle(&mut self, callback: Callback) -> CallbackHandle {
        let handle = self.next_handle();
        self.idle.push((handle, callback));
        handle
    }

    pub fn cancel_idle(&mut self, handle: CallbackHandle) -> bool {
        take_entry(&mut self.idle, handle).is_some()
    }

    /// Starts a timer whose first firing is one `period` after `now`.
    ///
    /// Periods below one millisecond are raised to one millisecond.
    pub fn start_timer(&mut self, now: f64, period: f64, handler: TimerHandler) -> CallbackHandle {
        let period = if period.is_finite() { period.max(1.0) } else { 1.0 };
        let handle = self.next_handle();
        self.timers.push(Timer {
            handle,
            period,
            due: now + period,
            handler: Some(handler),
        });
        handle
    }

    pub fn stop_timer(&mut self, handle: CallbackHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pending_idle(&self) -> usize {
        self.idle.len()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest due time among running timers.
    pub fn next_timer_due(&self) -> Option<f64> {
        self.timers
            .iter()
            .map(|t| t.due)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Runs every frame callback pending at call time. Returns how many ran.
    pub fn run_frames(queue: &RefCell<Self>, now: f64) -> usize {
        run_batch(queue, now, frames_of)
    }

    /// Runs every idle callback pending at call time. Returns how many ran.
    pub fn run_idle(queue: &RefCell<Self>, now: f64) -> usize {
        run_batch(queue, now, idle_of)
    }

    /// Fires every timer due at `now` once. Returns how many fired.
    ///
    /// A timer that fell more than one period behind skips the missed
    /// firings instead of bursting.
    pub fn run_timers(queue: &RefCell<Self>, now: f64) -> usize {
        let due: Vec<CallbackHandle> = queue
            .borrow()
            .timers
            .iter()
            .filter(|t| t.due <= now)
            .map(|t| t.handle)
            .collect();

        let mut fired = 0;
        for handle in due {
            let handler = {
                let mut q = queue.borrow_mut();
                let Some(timer) = q.timers.iter_mut().find(|t| t.handle == handle) else {
                    continue;
                };
                timer.due += timer.period;
                if timer.due <= now {
                    timer.due = now + timer.period;
                }
                timer.handler.take()
            };

            let Some(mut handler) = handler else {
                continue;
            };
            handler(now);
            fired += 1;

            // The handler may have stopped its own timer.
            let mut q = queue.borrow_mut();
            if let Some(timer) = q.timers.iter_mut().find(|t| t.handle == handle) {
                timer.handler = Some(handler);
            }
        }
        fired
    }
}

fn frames_of(q: &mut CallbackQueue) -> &mut Vec<Entry> {
    &mut q.frames
}

fn idle_of(q: &mut CallbackQueue) -> &mut Vec<Entry> {
    &mut q.idle
}

fn take_entry(list: &mut Vec<Entry>, handle: CallbackHandle) -> Option<Callback> {
    let index = list.iter().position(|(h, _)| *h == handle)?;
    Some(list.remove(index).1)
}

fn run_batch(
    queue: &RefCell<CallbackQueue>,
    now: f64,
    select: fn(&mut CallbackQueue) -> &mut Vec<Entry>,
) -> usize {
    let due: Vec<CallbackHandle> = {
        let mut q = queue.borrow_mut();
        select(&mut *q).iter().map(|(h, _)| *h).collect()
    };

    let mut ran = 0;
    for handle in due {
        let callback = {
            let mut q = queue.borrow_mut();
            take_entry(select(&mut *q), handle)
        };
        if let Some(callback) = callback {
            callback(now);
            ran += 1;
        }
    }
    ran
}
