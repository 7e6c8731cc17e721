//! Headless recorder: one NDJSON line of draw commands per frame

use serde::Serialize;

use super::session::{ChunkSink, Recorder};
use crate::error::CaptureError;
use crate::renderer::{DrawCommand, RecordingSurface};

pub const NDJSON_MIME: &str = "application/x-ndjson";

/// Named audio tracks offered to a headless capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTrackList(pub Vec<String>);

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    commands: &'a [DrawCommand],
}

/// Records each presented frame's draw commands.
///
/// With `deferred()` the flush waits for an explicit `flush()` call, which
/// mimics an encoder that delivers after `stop` returns.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    sink: Option<ChunkSink>,
    draining: Option<ChunkSink>,
    frames: u64,
    sessions: u32,
    audio_tracks: Vec<String>,
    deferred: bool,
    reject: bool,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the final flush until `flush()` is called
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// A recorder whose format is never supported
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    /// Deliver a deferred recording
    pub fn flush(&mut self) {
        if let Some(sink) = self.draining.take() {
            sink.finish();
        }
    }

    /// Frames recorded in the current (or last) session
    pub fn frames_recorded(&self) -> u64 {
        self.frames
    }

    pub fn sessions_begun(&self) -> u32 {
        self.sessions
    }

    /// Audio tracks merged into the current (or last) session
    pub fn audio_tracks(&self) -> &[String] {
        &self.audio_tracks
    }
}

impl Recorder for CommandRecorder {
    type Surface = RecordingSurface;
    type AudioStream = AudioTrackList;

    fn mime_type(&self) -> &str {
        NDJSON_MIME
    }

    fn begin(
        &mut self,
        _frame_rate: u32,
        audio: Option<&AudioTrackList>,
        sink: ChunkSink,
    ) -> Result<(), CaptureError> {
        if self.reject {
            return Err(CaptureError::UnsupportedFormat(NDJSON_MIME.to_string()));
        }
        // Finish anything still draining before reusing the recorder
        self.flush();

        self.audio_tracks = audio.map(|a| a.0.clone()).unwrap_or_default();
        self.frames = 0;
        self.sessions += 1;
        self.sink = Some(sink);
        Ok(())
    }

    fn frame_presented(&mut self, surface: &RecordingSurface) {
        let Some(sink) = &self.sink else { return };
        let record = FrameRecord {
            frame: self.frames,
            commands: surface.commands(),
        };
        match serde_json::to_vec(&record) {
            Ok(mut line) => {
                line.push(b'\n');
                sink.push(line);
                self.frames += 1;
            }
            Err(e) => log::warn!("Failed to encode frame {}: {}", self.frames, e),
        }
    }

    fn finish(&mut self) {
        let Some(sink) = self.sink.take() else { return };
        if self.deferred {
            self.draining = Some(sink);
        } else {
            sink.finish();
        }
    }
}
