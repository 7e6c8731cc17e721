//! Capture sessions: surface + audio into one recorded artifact
//!
//! A session owns a `Recorder` (the encoding facility) and guards it so only
//! one recording is active at a time. Encoded chunks flow into a `ChunkSink`
//! which concatenates them and fires the completion callback exactly once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::CaptureError;

/// A finalized recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl CaptureArtifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the mime type
    pub fn extension(&self) -> &'static str {
        let base = self.mime_type.split(';').next().unwrap_or_default();
        match base {
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            "application/x-ndjson" => "ndjson",
            _ => "bin",
        }
    }
}

/// Receives the artifact once the recorder has flushed
pub type CompletionCallback = Box<dyn FnOnce(CaptureArtifact)>;

struct SinkState {
    mime_type: String,
    chunks: Vec<Vec<u8>>,
    on_complete: Option<CompletionCallback>,
}

/// Shared chunk buffer handed to the recorder for one session
#[derive(Clone)]
pub struct ChunkSink {
    state: Rc<RefCell<SinkState>>,
}

impl ChunkSink {
    pub fn new(mime_type: impl Into<String>, on_complete: CompletionCallback) -> Self {
        Self {
            state: Rc::new(RefCell::new(SinkState {
                mime_type: mime_type.into(),
                chunks: Vec::new(),
                on_complete: Some(on_complete),
            })),
        }
    }

    /// Buffer an encoded chunk. Zero-length chunks are dropped.
    pub fn push(&self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.state.borrow_mut().chunks.push(chunk);
    }

    /// Concatenate the buffered chunks and deliver the artifact.
    ///
    /// Only the first call delivers; the buffer is empty afterwards.
    pub fn finish(&self) {
        let (artifact, callback) = {
            let mut state = self.state.borrow_mut();
            let chunks = std::mem::take(&mut state.chunks);
            let artifact = CaptureArtifact {
                mime_type: state.mime_type.clone(),
                data: chunks.concat(),
            };
            (artifact, state.on_complete.take())
        };

        match callback {
            Some(callback) => {
                log::info!("Capture finalized: {} bytes", artifact.len());
                callback(artifact);
            }
            None => log::warn!("Capture already finalized, dropping late flush"),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().on_complete.is_none()
    }

    pub fn buffered_len(&self) -> usize {
        self.state.borrow().chunks.iter().map(Vec::len).sum()
    }
}

impl fmt::Debug for ChunkSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkSink")
            .field("buffered", &self.buffered_len())
            .finish()
    }
}

/// The encoding facility behind a capture session
pub trait Recorder {
    /// Surface the recorder taps for frames
    type Surface: crate::renderer::Surface + ?Sized;
    /// Externally supplied audio to mix into the recording
    type AudioStream;

    fn mime_type(&self) -> &str;

    /// Start recording into `sink`. Must not touch `sink` on error.
    fn begin(
        &mut self,
        frame_rate: u32,
        audio: Option<&Self::AudioStream>,
        sink: ChunkSink,
    ) -> Result<(), CaptureError>;

    /// Called after every rendered frame while recording
    fn frame_presented(&mut self, _surface: &Self::Surface) {}

    /// Stop recording; the sink must be finished once the encoder flushes
    fn finish(&mut self);
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Inactive,
    Recording,
}

/// One-at-a-time capture of the surface (and optional audio)
pub struct CaptureSession<R: Recorder> {
    recorder: R,
    frame_rate: u32,
    state: CaptureState,
}

impl<R: Recorder> CaptureSession<R> {
    pub fn new(recorder: R, frame_rate: u32) -> Self {
        Self {
            recorder,
            frame_rate,
            state: CaptureState::Inactive,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    /// Begin a new recording. A second start while one is active is a no-op.
    pub fn start(
        &mut self,
        on_complete: CompletionCallback,
        audio: Option<&R::AudioStream>,
    ) -> Result<(), CaptureError> {
        if self.is_active() {
            log::warn!("Capture already active, ignoring start");
            return Ok(());
        }

        let sink = ChunkSink::new(self.recorder.mime_type(), on_complete);
        self.recorder.begin(self.frame_rate, audio, sink)?;
        self.state = CaptureState::Recording;
        log::info!(
            "Capture started ({} @ {} fps)",
            self.recorder.mime_type(),
            self.frame_rate
        );
        Ok(())
    }

    /// Feed a freshly drawn frame to the recorder
    pub fn frame_presented(&mut self, surface: &R::Surface) {
        if self.is_active() {
            self.recorder.frame_presented(surface);
        }
    }

    /// Finalize the active recording; does nothing when inactive
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        self.state = CaptureState::Inactive;
        self.recorder.finish();
        log::info!("Capture stopping, waiting for flush");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::headless::CommandRecorder;
    use crate::renderer::{Renderer, RecordingSurface};
    use crate::sim::PhysicsState;
    use crate::tuning::TuningParameters;

    type Collected = Rc<RefCell<Vec<CaptureArtifact>>>;

    fn collector() -> (Collected, impl Fn() -> CompletionCallback) {
        let store: Collected = Rc::new(RefCell::new(Vec::new()));
        let for_cb = store.clone();
        let make = move || -> CompletionCallback {
            let store = for_cb.clone();
            Box::new(move |artifact| store.borrow_mut().push(artifact))
        };
        (store, make)
    }

    fn drawn_surface() -> RecordingSurface {
        let state = PhysicsState::new(400.0, 400.0, TuningParameters::default(), 9);
        let mut surface = RecordingSurface::new(400.0, 400.0);
        Renderer::new().draw(&mut surface, &state, &[], 0.0);
        surface
    }

    #[test]
    fn test_sink_drops_empty_chunks_and_finishes_once() {
        let (store, make) = collector();
        let sink = ChunkSink::new("video/webm", make());
        sink.push(vec![1, 2]);
        sink.push(Vec::new());
        sink.push(vec![3]);
        assert_eq!(sink.buffered_len(), 3);

        sink.finish();
        sink.finish();
        assert!(sink.is_finished());
        assert_eq!(sink.buffered_len(), 0);

        let artifacts = store.borrow();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].data, vec![1, 2, 3]);
        assert_eq!(artifacts[0].extension(), "webm");
    }

    #[test]
    fn test_start_stop_with_frame_yields_one_artifact() {
        let (store, make) = collector();
        let mut session = CaptureSession::new(CommandRecorder::new(), 60);
        let surface = drawn_surface();

        session.start(make(), None).unwrap();
        assert!(session.is_active());
        session.frame_presented(&surface);
        session.stop();

        assert!(!session.is_active());
        let artifacts = store.borrow();
        assert_eq!(artifacts.len(), 1);
        assert!(!artifacts[0].is_empty());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let (store, make) = collector();
        let mut session = CaptureSession::new(CommandRecorder::new(), 60);

        session.start(make(), None).unwrap();
        session.start(make(), None).unwrap();
        assert_eq!(session.recorder().sessions_begun(), 1);

        session.stop();
        session.stop();
        assert_eq!(store.borrow().len(), 1);
    }

    #[test]
    fn test_frames_ignored_while_inactive() {
        let mut session = CaptureSession::new(CommandRecorder::new(), 60);
        session.frame_presented(&drawn_surface());
        assert_eq!(session.recorder().frames_recorded(), 0);
    }

    #[test]
    fn test_failed_start_stays_inactive() {
        let (store, make) = collector();
        let mut session = CaptureSession::new(CommandRecorder::rejecting(), 60);

        let result = session.start(make(), None);
        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
        assert!(!session.is_active());
        session.stop();
        assert!(store.borrow().is_empty());
    }

    #[test]
    fn test_deferred_flush_delivers_after_stop() {
        let (store, make) = collector();
        let mut session = CaptureSession::new(CommandRecorder::new().deferred(), 60);
        session.start(make(), None).unwrap();
        session.frame_presented(&drawn_surface());
        session.stop();
        assert!(store.borrow().is_empty(), "delivery waits for the flush");

        session.recorder_mut().flush();
        assert_eq!(store.borrow().len(), 1);

        // A new session starts with an empty buffer
        session.start(make(), None).unwrap();
        session.stop();
        session.recorder_mut().flush();
        let artifacts = store.borrow();
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts[1].is_empty());
    }
}
