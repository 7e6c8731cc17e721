//! Browser platform: performance.now(), requestAnimationFrame, setTimeout

use std::time::Duration;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::{Clock, FrameHandle, FrameScheduler, SleepFuture, Timer};

/// `performance.now()` clock (falls back to `Date.now()`)
#[derive(Debug, Clone, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

/// requestAnimationFrame scheduler.
///
/// The frame callback is installed once with `set_callback` and reused for
/// every request, so the closure lives as long as the scheduler.
#[derive(Default)]
pub struct RafScheduler {
    callback: Option<Closure<dyn FnMut(f64)>>,
}

impl RafScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback(&mut self, callback: Closure<dyn FnMut(f64)>) {
        self.callback = Some(callback);
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let Some(callback) = &self.callback else {
            log::warn!("Frame requested before callback was installed");
            return None;
        };
        let window = web_sys::window()?;
        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => Some(FrameHandle(id)),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle.0);
        }
    }
}

/// setTimeout-backed cooperative sleep
#[derive(Debug, Clone, Default)]
pub struct TimeoutTimer;

impl Timer for TimeoutTimer {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let mut scheduled: Result<(), String> = Ok(());
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            scheduled = match web_sys::window() {
                Some(window) => window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                    .map(|_| ())
                    .map_err(|e| format!("{:?}", e)),
                None => Err("no window".to_string()),
            };
        });

        Box::pin(async move {
            scheduled?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| format!("{:?}", e))
        })
    }
}
