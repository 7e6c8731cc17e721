//! Unattended batch capture
//!
//! Runs N independent reset -> record -> wait -> stop cycles with a short
//! pause after each one and collects one artifact per run. The waits are
//! cooperative sleeps, so the host keeps rendering (and recording) while the
//! orchestrator is suspended.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureArtifact, CompletionCallback, Recorder};
use crate::consts::BATCH_PAUSE_SECS;
use crate::driver::Simulation;
use crate::error::{BatchError, CaptureError};
use crate::platform::{Clock, FrameScheduler, Timer};
use crate::renderer::Surface;

/// What a batch drives between runs
pub trait BatchHost {
    /// Start a fresh run: reset physics and any audio collaborator, keep animating
    fn reset_run(&mut self);

    fn is_capturing(&self) -> bool;

    fn begin_capture(&mut self, on_complete: CompletionCallback) -> Result<(), CaptureError>;

    fn end_capture(&mut self);
}

impl<S, F, C, R> BatchHost for Simulation<S, F, C, R>
where
    S: Surface,
    F: FrameScheduler,
    C: Clock,
    R: Recorder<Surface = S>,
{
    fn reset_run(&mut self) {
        self.reset();
        self.start();
    }

    fn is_capturing(&self) -> bool {
        Simulation::is_capturing(self)
    }

    fn begin_capture(&mut self, on_complete: CompletionCallback) -> Result<(), CaptureError> {
        self.start_capture(on_complete, None)
    }

    fn end_capture(&mut self) {
        self.stop_capture();
    }
}

/// Batch shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Number of runs to record
    pub runs: u32,
    /// Recording length of each run (seconds)
    pub recording_secs: f64,
    /// Pause after each run (seconds)
    pub pause_secs: f64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            runs: 3,
            recording_secs: 10.0,
            pause_secs: BATCH_PAUSE_SECS,
        }
    }
}

impl BatchSettings {
    /// Recording and pause lengths; fails on negative, NaN or oversized values
    pub fn durations(&self) -> Result<(Duration, Duration), BatchError> {
        let seconds = |name: &str, secs: f64| {
            Duration::try_from_secs_f64(secs).map_err(|e| {
                BatchError::InvalidSettings(format!("{} = {}: {}", name, secs, e))
            })
        };
        Ok((
            seconds("recording_secs", self.recording_secs)?,
            seconds("pause_secs", self.pause_secs)?,
        ))
    }
}

/// Clears the batch-mode flag however the run ends
struct BatchModeGuard<'a>(&'a Cell<bool>);

impl Drop for BatchModeGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Sequences batch runs against a `BatchHost`
pub struct BatchOrchestrator<T: Timer> {
    settings: BatchSettings,
    timer: T,
    active: Rc<Cell<bool>>,
    completed: Rc<Cell<u32>>,
}

impl<T: Timer> BatchOrchestrator<T> {
    pub fn new(settings: BatchSettings, timer: T) -> Self {
        Self {
            settings,
            timer,
            active: Rc::new(Cell::new(false)),
            completed: Rc::new(Cell::new(0)),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Change the batch shape; ignored while a batch is running
    pub fn set_settings(&mut self, settings: BatchSettings) {
        if self.is_active() {
            log::warn!("Batch running, keeping current settings");
            return;
        }
        self.settings = settings;
    }

    /// Whether batch mode is on
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// (completed runs, total runs)
    pub fn progress(&self) -> (u32, u32) {
        (self.completed.get(), self.settings.runs)
    }

    /// Record every run and return the artifacts in run order.
    ///
    /// Any failure stops an in-flight capture, discards what was collected and
    /// aborts the rest of the batch. Batch mode is off again when this returns.
    pub async fn run<H: BatchHost>(
        &self,
        host: &RefCell<H>,
    ) -> Result<Vec<CaptureArtifact>, BatchError> {
        if self.active.get() {
            return Err(BatchError::AlreadyRunning);
        }
        if host.borrow().is_capturing() {
            return Err(BatchError::CaptureBusy);
        }
        let (recording, pause) = self.settings.durations()?;

        self.active.set(true);
        let _guard = BatchModeGuard(&self.active);
        self.completed.set(0);

        let runs = self.settings.runs;
        let collected: Rc<RefCell<Vec<CaptureArtifact>>> = Rc::new(RefCell::new(Vec::new()));
        log::info!(
            "Batch started: {} runs of {:.1}s",
            runs,
            self.settings.recording_secs
        );

        for run in 0..runs {
            {
                let mut host = host.borrow_mut();
                host.reset_run();
                let sink = collected.clone();
                let on_complete: CompletionCallback =
                    Box::new(move |artifact| sink.borrow_mut().push(artifact));
                if let Err(source) = host.begin_capture(on_complete) {
                    log::error!("Batch run {} failed to start capture: {}", run + 1, source);
                    Self::abort(&mut *host);
                    return Err(BatchError::Capture { run, source });
                }
            }

            if let Err(e) = self.timer.sleep(recording).await {
                Self::abort(&mut *host.borrow_mut());
                return Err(BatchError::Timer(e));
            }

            host.borrow_mut().end_capture();
            self.completed.set(run + 1);
            log::info!("Batch run {}/{} recorded", run + 1, runs);

            self.timer
                .sleep(pause)
                .await
                .map_err(BatchError::Timer)?;
        }

        let artifacts = std::mem::take(&mut *collected.borrow_mut());
        let received = artifacts.len() as u32;
        if received < runs {
            log::error!("Batch finished with {}/{} recordings", received, runs);
            return Err(BatchError::MissingArtifacts {
                expected: runs,
                received,
            });
        }

        log::info!("Batch complete: {} recordings", received);
        Ok(artifacts)
    }

    fn abort<H: BatchHost>(host: &mut H) {
        if host.is_capturing() {
            host.end_capture();
        }
        log::warn!("Batch aborted, discarding recordings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSession, CommandRecorder};
    use crate::platform::{InstantTimer, ManualClock, ManualScheduler};
    use crate::renderer::RecordingSurface;
    use crate::tuning::TuningParameters;

    #[derive(Default)]
    struct FakeHost {
        events: Vec<String>,
        pending: Option<CompletionCallback>,
        fail_at: Option<u32>,
        drop_artifacts: bool,
        starts: u32,
    }

    impl BatchHost for FakeHost {
        fn reset_run(&mut self) {
            self.events.push("reset".into());
        }

        fn is_capturing(&self) -> bool {
            self.pending.is_some()
        }

        fn begin_capture(&mut self, on_complete: CompletionCallback) -> Result<(), CaptureError> {
            let index = self.starts;
            self.starts += 1;
            if self.fail_at == Some(index) {
                return Err(CaptureError::UnsupportedFormat("video/test".into()));
            }
            self.events.push("start".into());
            self.pending = Some(on_complete);
            Ok(())
        }

        fn end_capture(&mut self) {
            self.events.push("stop".into());
            if let Some(callback) = self.pending.take() {
                if !self.drop_artifacts {
                    callback(CaptureArtifact {
                        mime_type: "video/webm".into(),
                        data: vec![self.starts as u8],
                    });
                }
            }
        }
    }

    fn settings(runs: u32, recording_secs: f64) -> BatchSettings {
        BatchSettings {
            runs,
            recording_secs,
            pause_secs: BATCH_PAUSE_SECS,
        }
    }

    #[test]
    fn test_three_runs_of_two_seconds() {
        let timer = InstantTimer::new();
        let orchestrator = BatchOrchestrator::new(settings(3, 2.0), timer.clone());
        let host = RefCell::new(FakeHost::default());

        let artifacts = pollster::block_on(orchestrator.run(&host)).unwrap();

        assert_eq!(artifacts.len(), 3);
        assert_eq!(
            artifacts.iter().map(|a| a.data[0]).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let two = Duration::from_secs(2);
        let one = Duration::from_secs(1);
        assert_eq!(timer.slept(), vec![two, one, two, one, two, one]);
        assert_eq!(
            host.borrow().events,
            ["reset", "start", "stop", "reset", "start", "stop", "reset", "start", "stop"]
        );
        assert!(!orchestrator.is_active());
        assert_eq!(orchestrator.progress(), (3, 3));
    }

    #[test]
    fn test_capture_failure_aborts_and_clears_mode() {
        let orchestrator = BatchOrchestrator::new(settings(3, 2.0), InstantTimer::new());
        let host = RefCell::new(FakeHost {
            fail_at: Some(1),
            ..FakeHost::default()
        });

        let result = pollster::block_on(orchestrator.run(&host));

        match result {
            Err(BatchError::Capture { run, source }) => {
                assert_eq!(run, 1);
                assert!(matches!(source, CaptureError::UnsupportedFormat(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!orchestrator.is_active());
        assert_eq!(orchestrator.progress(), (1, 3));
        assert!(!host.borrow().is_capturing());
    }

    #[test]
    fn test_timer_failure_stops_in_flight_capture() {
        // Sleep #2 is the second run's recording wait
        let timer = InstantTimer::new().failing_at(2);
        let orchestrator = BatchOrchestrator::new(settings(3, 2.0), timer);
        let host = RefCell::new(FakeHost::default());

        let result = pollster::block_on(orchestrator.run(&host));

        assert!(matches!(result, Err(BatchError::Timer(_))));
        assert!(!host.borrow().is_capturing());
        assert_eq!(host.borrow().events.last().map(String::as_str), Some("stop"));
        assert!(!orchestrator.is_active());
    }

    #[test]
    fn test_refuses_while_manual_capture_active() {
        let orchestrator = BatchOrchestrator::new(settings(2, 1.0), InstantTimer::new());
        let mut fake = FakeHost::default();
        fake.begin_capture(Box::new(|_| {})).unwrap();
        let host = RefCell::new(fake);

        let result = pollster::block_on(orchestrator.run(&host));
        assert_eq!(result, Err(BatchError::CaptureBusy));
        assert_eq!(host.borrow().events, ["start"]);
    }

    #[test]
    fn test_missing_artifacts_reported() {
        let orchestrator = BatchOrchestrator::new(settings(2, 1.0), InstantTimer::new());
        let host = RefCell::new(FakeHost {
            drop_artifacts: true,
            ..FakeHost::default()
        });

        let result = pollster::block_on(orchestrator.run(&host));
        assert_eq!(
            result,
            Err(BatchError::MissingArtifacts {
                expected: 2,
                received: 0
            })
        );
    }

    #[test]
    fn test_oversized_duration_rejected_before_batch_mode() {
        let timer = InstantTimer::new();
        let orchestrator = BatchOrchestrator::new(
            BatchSettings {
                runs: 1,
                recording_secs: 1e30,
                pause_secs: 1.0,
            },
            timer.clone(),
        );
        let host = RefCell::new(FakeHost::default());

        let result = pollster::block_on(orchestrator.run(&host));

        assert!(matches!(result, Err(BatchError::InvalidSettings(_))));
        assert!(!orchestrator.is_active());
        assert!(host.borrow().events.is_empty());
        assert!(timer.slept().is_empty());
    }

    #[test]
    fn test_durations_reject_negative_and_nan() {
        let mut batch = settings(1, -2.0);
        assert!(batch.durations().is_err());
        batch.recording_secs = f64::NAN;
        assert!(batch.durations().is_err());
        batch.recording_secs = 2.5;
        assert_eq!(
            batch.durations().unwrap(),
            (Duration::from_millis(2500), Duration::from_secs(1))
        );
    }

    #[test]
    fn test_settings_locked_only_while_running() {
        let mut orchestrator = BatchOrchestrator::new(settings(2, 1.0), InstantTimer::new());
        orchestrator.set_settings(settings(5, 3.0));
        assert_eq!(orchestrator.progress(), (0, 5));
    }

    #[test]
    fn test_batch_against_headless_simulation() {
        let scheduler = ManualScheduler::new();
        let clock = ManualClock::new(0.0);
        let sim = Simulation::new(
            RecordingSurface::new(320.0, 240.0),
            scheduler.clone(),
            clock.clone(),
            CaptureSession::new(CommandRecorder::new(), 60),
            TuningParameters::default(),
            Vec::new(),
            None,
            11,
        )
        .unwrap();
        let sim = Rc::new(RefCell::new(sim));

        // Each sleep pumps frames through the waited interval at 60 fps
        let pump = sim.clone();
        let timer = InstantTimer::with_hook(move |duration| {
            let frames = (duration.as_secs_f64() * 60.0).round() as u32;
            for _ in 0..frames {
                if scheduler.take_pending().is_none() {
                    break;
                }
                clock.advance(1000.0 / 60.0);
                pump.borrow_mut().on_frame();
            }
        });

        let orchestrator = BatchOrchestrator::new(settings(2, 0.5), timer);
        let artifacts = pollster::block_on(orchestrator.run(&*sim)).unwrap();

        assert_eq!(artifacts.len(), 2);
        for artifact in &artifacts {
            let text = std::str::from_utf8(&artifact.data).unwrap();
            assert_eq!(text.lines().count(), 30);
        }
        assert!(sim.borrow().is_running());
        assert!(!sim.borrow().is_capturing());
    }
}
