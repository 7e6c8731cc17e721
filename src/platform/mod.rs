//! Platform abstraction layer
//!
//! Handles browser/headless differences for:
//! - Time (monotonic milliseconds)
//! - Per-frame callbacks (requestAnimationFrame on web)
//! - Cooperative sleeps (setTimeout on web)
//!
//! Everything is single-threaded; callbacks interleave on the host event queue.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{InstantTimer, ManualClock, ManualScheduler};

/// Monotonic time source in milliseconds
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Identifier of a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// One-shot per-frame callback facility
pub trait FrameScheduler {
    /// Ask for the next frame callback. `None` if the host refused.
    fn request_frame(&mut self) -> Option<FrameHandle>;

    /// Cancel a callback that has not fired yet
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Future returned by `Timer::sleep`
pub type SleepFuture = Pin<Box<dyn Future<Output = Result<(), String>>>>;

/// Cooperative sleep that yields back to the host scheduler
pub trait Timer {
    fn sleep(&self, duration: Duration) -> SleepFuture;
}
