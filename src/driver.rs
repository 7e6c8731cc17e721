//! Animation driver: frame loop, run/stop/drag state, capture hookup
//!
//! The driver owns the physics state, the surface and the capture session.
//! The host calls `on_frame` whenever a requested frame fires; the driver
//! ticks physics, notifies the collision listener, repaints, feeds the
//! capture and asks for the next frame.

use glam::Vec2;

use crate::capture::{CaptureSession, CompletionCallback, Recorder};
use crate::error::{CaptureError, SetupError};
use crate::platform::{Clock, FrameHandle, FrameScheduler};
use crate::renderer::{LabelEntity, Renderer, Surface};
use crate::sim::PhysicsState;
use crate::tuning::TuningParameters;

/// Run state of the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Stopped,
    Running,
    /// Ball held by the pointer; `resume` says whether to run on release
    Dragging { resume: bool },
}

/// Elapsed run time that survives stop/start
#[derive(Debug, Clone, Copy, Default)]
struct Stopwatch {
    accumulated_ms: f64,
    running_since: Option<f64>,
}

impl Stopwatch {
    fn resume(&mut self, now: f64) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    fn pause(&mut self, now: f64) {
        if let Some(since) = self.running_since.take() {
            self.accumulated_ms += (now - since).max(0.0);
        }
    }

    fn restart(&mut self, now: f64) {
        let running = self.running_since.is_some();
        self.accumulated_ms = 0.0;
        self.running_since = running.then_some(now);
    }

    fn elapsed_ms(&self, now: f64) -> f64 {
        self.accumulated_ms
            + self
                .running_since
                .map_or(0.0, |since| (now - since).max(0.0))
    }
}

/// Collision listener; fired synchronously once per bounce
pub type CollisionListener = Box<dyn FnMut()>;

/// One simulation instance bound to one surface
pub struct Simulation<S, F, C, R>
where
    S: Surface,
    F: FrameScheduler,
    C: Clock,
    R: Recorder<Surface = S>,
{
    physics: PhysicsState,
    renderer: Renderer,
    surface: S,
    labels: Vec<LabelEntity>,
    scheduler: F,
    clock: C,
    stopwatch: Stopwatch,
    state: DriveState,
    pending_frame: Option<FrameHandle>,
    on_collision: Option<CollisionListener>,
    capture: CaptureSession<R>,
}

impl<S, F, C, R> Simulation<S, F, C, R>
where
    S: Surface,
    F: FrameScheduler,
    C: Clock,
    R: Recorder<Surface = S>,
{
    /// Build a stopped simulation and paint the first frame.
    ///
    /// Fails if the surface has no area.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surface: S,
        scheduler: F,
        clock: C,
        capture: CaptureSession<R>,
        tuning: TuningParameters,
        labels: Vec<LabelEntity>,
        on_collision: Option<CollisionListener>,
        seed: u64,
    ) -> Result<Self, SetupError> {
        let (width, height) = surface.size();
        if !(width > 0.0 && height > 0.0) {
            return Err(SetupError::SurfaceUnavailable(format!(
                "surface is {}x{}",
                width, height
            )));
        }

        let mut sim = Self {
            physics: PhysicsState::new(width, height, tuning, seed),
            renderer: Renderer::new(),
            surface,
            labels,
            scheduler,
            clock,
            stopwatch: Stopwatch::default(),
            state: DriveState::Stopped,
            pending_frame: None,
            on_collision,
            capture,
        };
        sim.redraw();
        log::info!("Simulation created ({}x{})", width, height);
        Ok(sim)
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriveState::Running
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DriveState::Dragging { .. })
    }

    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Host hook for installing the frame callback
    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Stopped -> Running. While dragging, run once the ball is released.
    pub fn start(&mut self) {
        match self.state {
            DriveState::Running => {}
            DriveState::Dragging { .. } => {
                self.state = DriveState::Dragging { resume: true };
            }
            DriveState::Stopped => {
                self.state = DriveState::Running;
                self.stopwatch.resume(self.clock.now_ms());
                self.schedule_frame();
                log::debug!("Simulation started");
            }
        }
    }

    /// Running -> Stopped, cancelling the pending frame.
    /// While dragging, stay stopped after release.
    pub fn stop(&mut self) {
        match self.state {
            DriveState::Stopped => {}
            DriveState::Dragging { .. } => {
                self.state = DriveState::Dragging { resume: false };
            }
            DriveState::Running => {
                self.halt();
                self.state = DriveState::Stopped;
                log::debug!("Simulation stopped");
            }
        }
    }

    fn halt(&mut self) {
        self.stopwatch.pause(self.clock.now_ms());
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Fresh ball, history and color; elapsed time restarts from zero
    pub fn reset(&mut self) {
        self.physics.reset();
        self.stopwatch.restart(self.clock.now_ms());
        self.redraw();
        log::info!("Simulation reset (hue {:.0})", self.physics.color.hue);
    }

    /// Frame callback. Does nothing unless running.
    pub fn on_frame(&mut self) {
        self.pending_frame = None;
        if self.state != DriveState::Running {
            return;
        }

        if self.physics.update().is_some() {
            if let Some(listener) = self.on_collision.as_mut() {
                listener();
            }
        }
        self.redraw();
        self.schedule_frame();
    }

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_some() {
            return;
        }
        self.pending_frame = self.scheduler.request_frame();
        if self.pending_frame.is_none() {
            log::warn!("Host refused the next frame request");
        }
    }

    /// Repaint without advancing physics
    pub fn redraw(&mut self) {
        let elapsed = self.elapsed_seconds();
        self.renderer
            .draw(&mut self.surface, &self.physics, &self.labels, elapsed);
        self.capture.frame_presented(&self.surface);
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.stopwatch.elapsed_ms(self.clock.now_ms()) / 1000.0
    }

    /// Grab the ball if `pos` is inside it; pauses the loop
    pub fn pointer_down(&mut self, pos: Vec2) -> bool {
        if self.is_dragging() || !self.physics.ball.contains(pos) {
            return false;
        }
        let resume = self.is_running();
        if resume {
            self.halt();
        }
        self.state = DriveState::Dragging { resume };
        log::debug!("Drag started at ({:.1}, {:.1})", pos.x, pos.y);
        true
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        if !self.is_dragging() {
            return;
        }
        self.physics.drag_to(pos);
        self.redraw();
    }

    pub fn pointer_up(&mut self) {
        let DriveState::Dragging { resume } = self.state else {
            return;
        };
        self.state = DriveState::Stopped;
        if resume {
            self.start();
        }
    }

    /// Replace the label overlay wholesale
    pub fn set_labels(&mut self, labels: Vec<LabelEntity>) {
        self.labels = labels;
        if !self.is_running() {
            self.redraw();
        }
    }

    pub fn labels(&self) -> &[LabelEntity] {
        &self.labels
    }

    pub fn set_collision_listener(&mut self, listener: Option<CollisionListener>) {
        self.on_collision = listener;
    }

    // === Tuning ===

    pub fn tuning(&self) -> &TuningParameters {
        &self.physics.tuning
    }

    pub fn set_tuning(&mut self, tuning: TuningParameters) {
        self.physics.tuning = tuning;
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.physics.tuning.set_gravity(gravity);
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.physics.tuning.set_decay(decay);
    }

    pub fn set_velocity_increase_rate(&mut self, rate: f32) {
        self.physics.tuning.set_velocity_increase_rate(rate);
    }

    pub fn set_growth_rate(&mut self, rate: f32) {
        self.physics.tuning.set_growth_rate(rate);
    }

    // === Capture ===

    pub fn start_capture(
        &mut self,
        on_complete: CompletionCallback,
        audio: Option<&R::AudioStream>,
    ) -> Result<(), CaptureError> {
        self.capture.start(on_complete, audio)
    }

    pub fn stop_capture(&mut self) {
        self.capture.stop();
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_active()
    }

    /// The recording backend (e.g. for its audio destination)
    pub fn capture_backend(&self) -> &R {
        self.capture.recorder()
    }

    pub fn capture_backend_mut(&mut self) -> &mut R {
        self.capture.recorder_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureArtifact, CommandRecorder};
    use crate::platform::{ManualClock, ManualScheduler};
    use crate::renderer::RecordingSurface;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type TestSim = Simulation<RecordingSurface, ManualScheduler, ManualClock, CommandRecorder>;

    struct Rig {
        sim: TestSim,
        scheduler: ManualScheduler,
        clock: ManualClock,
    }

    fn rig() -> Rig {
        rig_with(TuningParameters::default(), None)
    }

    fn rig_with(tuning: TuningParameters, listener: Option<CollisionListener>) -> Rig {
        let scheduler = ManualScheduler::new();
        let clock = ManualClock::new(1000.0);
        let sim = Simulation::new(
            RecordingSurface::new(400.0, 400.0),
            scheduler.clone(),
            clock.clone(),
            CaptureSession::new(CommandRecorder::new(), 60),
            tuning,
            Vec::new(),
            listener,
            7,
        )
        .unwrap();
        Rig {
            sim,
            scheduler,
            clock,
        }
    }

    impl Rig {
        /// Fire the pending frame, if any, 16ms later
        fn fire(&mut self) -> bool {
            if self.scheduler.take_pending().is_none() {
                return false;
            }
            self.clock.advance(16.0);
            self.sim.on_frame();
            true
        }
    }

    #[test]
    fn test_zero_size_surface_rejected() {
        let result = Simulation::new(
            RecordingSurface::new(0.0, 400.0),
            ManualScheduler::new(),
            ManualClock::new(0.0),
            CaptureSession::new(CommandRecorder::new(), 60),
            TuningParameters::default(),
            Vec::new(),
            None,
            1,
        );
        assert!(matches!(result, Err(SetupError::SurfaceUnavailable(_))));
    }

    #[test]
    fn test_start_schedules_and_ticks() {
        let mut rig = rig();
        assert!(!rig.sim.is_running());
        assert_eq!(rig.scheduler.pending(), None);

        rig.sim.start();
        rig.sim.start();
        assert!(rig.sim.is_running());
        assert_eq!(rig.scheduler.requests(), 1);

        for _ in 0..3 {
            assert!(rig.fire());
        }
        assert_eq!(rig.sim.physics().time_ticks, 3);
        assert!(rig.scheduler.pending().is_some());
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let mut rig = rig();
        rig.sim.start();
        let handle = rig.scheduler.pending().unwrap();
        rig.sim.stop();

        assert!(!rig.sim.is_running());
        assert_eq!(rig.scheduler.cancelled(), vec![handle]);
        assert!(!rig.fire());

        // A stray callback after stop must not tick
        rig.sim.on_frame();
        assert_eq!(rig.sim.physics().time_ticks, 0);
    }

    #[test]
    fn test_elapsed_resumes_after_stop() {
        let mut rig = rig();
        rig.sim.start();
        rig.clock.advance(2000.0);
        rig.sim.stop();
        rig.clock.advance(5000.0);
        assert!((rig.sim.elapsed_seconds() - 2.0).abs() < 1e-9);

        rig.sim.start();
        rig.clock.advance(500.0);
        assert!((rig.sim.elapsed_seconds() - 2.5).abs() < 1e-9);

        rig.sim.reset();
        assert_eq!(rig.sim.elapsed_seconds(), 0.0);
        rig.clock.advance(1000.0);
        assert!((rig.sim.elapsed_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_leaves_ball_at_pointer_and_resumes() {
        let mut rig = rig();
        rig.sim.start();
        rig.fire();
        let grab = rig.sim.physics().ball.center;

        assert!(rig.sim.pointer_down(grab));
        assert_eq!(rig.sim.state(), DriveState::Dragging { resume: true });
        assert_eq!(rig.scheduler.pending(), None);

        let target = Vec2::new(180.0, 250.0);
        rig.sim.pointer_move(target);
        let ticks = rig.sim.physics().time_ticks;
        rig.sim.pointer_up();

        let ball = rig.sim.physics().ball;
        assert_eq!(ball.center, target);
        assert_eq!(ball.velocity, Vec2::ZERO);
        assert_eq!(rig.sim.physics().time_ticks, ticks, "drag must not tick");
        assert!(rig.sim.is_running());

        assert!(rig.fire());
        assert_eq!(rig.sim.physics().time_ticks, ticks + 1);
    }

    #[test]
    fn test_pointer_outside_ball_ignored() {
        let mut rig = rig();
        rig.sim.start();
        assert!(!rig.sim.pointer_down(Vec2::new(5.0, 5.0)));
        assert!(rig.sim.is_running());
        rig.sim.pointer_move(Vec2::new(100.0, 100.0));
        assert_ne!(rig.sim.physics().ball.center, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_stop_while_dragging_stays_stopped() {
        let mut rig = rig();
        rig.sim.start();
        let grab = rig.sim.physics().ball.center;
        rig.sim.pointer_down(grab);
        rig.sim.stop();
        assert_eq!(rig.sim.state(), DriveState::Dragging { resume: false });
        rig.sim.pointer_up();
        assert_eq!(rig.sim.state(), DriveState::Stopped);
        assert_eq!(rig.scheduler.pending(), None);
    }

    #[test]
    fn test_drag_from_stopped_then_start_resumes_on_release() {
        let mut rig = rig();
        let grab = rig.sim.physics().ball.center;
        assert!(rig.sim.pointer_down(grab));
        assert_eq!(rig.sim.state(), DriveState::Dragging { resume: false });

        rig.sim.start();
        assert_eq!(rig.scheduler.pending(), None, "no frames while held");
        rig.sim.pointer_up();
        assert!(rig.sim.is_running());
        assert!(rig.scheduler.pending().is_some());
    }

    #[test]
    fn test_collision_listener_fires_once_per_bounce() {
        let hits = Rc::new(Cell::new(0u32));
        let counter = hits.clone();
        let mut rig = rig_with(
            TuningParameters::default(),
            Some(Box::new(move || counter.set(counter.get() + 1))),
        );
        rig.sim.start();
        for _ in 0..600 {
            rig.fire();
        }
        assert!(hits.get() > 0);
        assert_eq!(hits.get() as usize, rig.sim.physics().marks.len());
    }

    #[test]
    fn test_tuning_setters_take_effect_next_tick() {
        let mut rig = rig_with(TuningParameters::neutral(), None);
        rig.sim.set_gravity(1.0);
        rig.sim.start();
        rig.fire();
        assert!((rig.sim.physics().ball.velocity.y - 1.0).abs() < 1e-5);

        rig.sim.set_velocity_increase_rate(0.05);
        rig.sim.set_growth_rate(0.1);
        assert!((rig.sim.tuning().velocity_increase_rate() - 0.05).abs() < 1e-6);
        assert!((rig.sim.tuning().growth_rate() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_capture_records_rendered_frames() {
        let mut rig = rig();
        let out: Rc<RefCell<Vec<CaptureArtifact>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();

        rig.sim.start();
        rig.sim
            .start_capture(Box::new(move |a| sink.borrow_mut().push(a)), None)
            .unwrap();
        assert!(rig.sim.is_capturing());
        for _ in 0..4 {
            rig.fire();
        }
        rig.sim.stop_capture();

        assert!(!rig.sim.is_capturing());
        assert_eq!(rig.sim.capture_backend().frames_recorded(), 4);
        let artifacts = out.borrow();
        assert_eq!(artifacts.len(), 1);
        assert!(!artifacts[0].is_empty());
    }

    #[test]
    fn test_rejected_capture_leaves_loop_running() {
        let scheduler = ManualScheduler::new();
        let clock = ManualClock::new(1000.0);
        let sim = Simulation::new(
            RecordingSurface::new(400.0, 400.0),
            scheduler.clone(),
            clock.clone(),
            CaptureSession::new(CommandRecorder::rejecting(), 60),
            TuningParameters::default(),
            Vec::new(),
            None,
            7,
        )
        .unwrap();
        let mut rig = Rig {
            sim,
            scheduler,
            clock,
        };

        rig.sim.start();
        rig.fire();
        let delivered = Rc::new(Cell::new(false));
        let flag = delivered.clone();
        let result = rig.sim.start_capture(Box::new(move |_| flag.set(true)), None);
        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
        assert!(!rig.sim.is_capturing());
        assert!(rig.sim.is_running());

        let ticks = rig.sim.physics().time_ticks;
        for _ in 0..3 {
            assert!(rig.fire());
        }
        assert_eq!(rig.sim.physics().time_ticks, ticks + 3);
        assert_eq!(rig.sim.capture_backend().frames_recorded(), 0);
        assert!(!delivered.get());
    }

    #[test]
    fn test_labels_replaced_and_drawn() {
        let mut rig = rig();
        let labels = LabelEntity::list_from_json(
            r#"[{"id": 1, "text": "Hello", "position": [200.0, 50.0]}]"#,
        )
        .unwrap();
        rig.sim.set_labels(labels);
        assert_eq!(rig.sim.labels().len(), 1);
        let drawn = rig.sim.surface().commands().iter().any(|c| {
            matches!(c, crate::renderer::DrawCommand::FillText { text, .. } if text == "Hello")
        });
        assert!(drawn);
    }
}
