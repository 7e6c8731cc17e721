//! Headless platform: manually advanced clock, frame scheduler and timer
//!
//! Used by the native binary and by tests. All handles are cheap clones that
//! share state, so a caller can keep one after moving another into the driver.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::{Clock, FrameHandle, FrameScheduler, SleepFuture, Timer};

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next_id: i32,
    pending: Option<FrameHandle>,
    requests: u32,
    cancelled: Vec<FrameHandle>,
}

/// Scheduler that just remembers the outstanding request
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request that has not been cancelled or consumed yet
    pub fn pending(&self) -> Option<FrameHandle> {
        self.state.borrow().pending
    }

    /// Consume the pending request (the host "fires" the frame)
    pub fn take_pending(&self) -> Option<FrameHandle> {
        self.state.borrow_mut().pending.take()
    }

    pub fn requests(&self) -> u32 {
        self.state.borrow().requests
    }

    pub fn cancelled(&self) -> Vec<FrameHandle> {
        self.state.borrow().cancelled.clone()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.requests += 1;
        let handle = FrameHandle(state.next_id);
        state.pending = Some(handle);
        Some(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        state.cancelled.push(handle);
        if state.pending == Some(handle) {
            state.pending = None;
        }
    }
}

type SleepHook = Rc<RefCell<dyn FnMut(Duration)>>;

/// Timer whose sleeps complete immediately.
///
/// Every requested duration is logged; an optional hook runs on each sleep
/// (the native binary uses it to pump frames through the waited interval).
#[derive(Clone, Default)]
pub struct InstantTimer {
    slept: Rc<RefCell<Vec<Duration>>>,
    hook: Option<SleepHook>,
    fail_at: Option<usize>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with each requested duration before completing the sleep
    pub fn with_hook(hook: impl FnMut(Duration) + 'static) -> Self {
        Self {
            hook: Some(Rc::new(RefCell::new(hook))),
            ..Self::default()
        }
    }

    /// Make the `index`-th sleep (0-based) fail
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Durations requested so far, in order
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Timer for InstantTimer {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        let index = {
            let mut slept = self.slept.borrow_mut();
            slept.push(duration);
            slept.len() - 1
        };

        if self.fail_at == Some(index) {
            return Box::pin(std::future::ready(Err(format!("sleep #{} failed", index))));
        }

        if let Some(hook) = &self.hook {
            (*hook.borrow_mut())(duration);
        }
        Box::pin(std::future::ready(Ok(())))
    }
}
