//! Error types for setup, capture and batch runs.

use std::fmt;

/// Errors that abort construction of a simulation instance.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    /// The drawable surface is missing or has no area.
    SurfaceUnavailable(String),
    /// The audio context (and its capture destination) could not be created.
    AudioUnavailable(String),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::SurfaceUnavailable(msg) => write!(f, "Drawing surface unavailable: {}", msg),
            SetupError::AudioUnavailable(msg) => write!(f, "Audio context unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SetupError {}

/// Errors reported by `CaptureSession::start`. The simulation keeps running.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// The recording facility does not support the requested encoding.
    UnsupportedFormat(String),
    /// The surface stream could not be captured.
    Stream(String),
    /// An audio track could not be merged into the capture stream.
    AudioTrack(String),
    /// The recorder could not be constructed or started.
    Recorder(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::UnsupportedFormat(mime) => {
                write!(f, "Recording format not supported: {}", mime)
            }
            CaptureError::Stream(msg) => write!(f, "Failed to capture surface stream: {}", msg),
            CaptureError::AudioTrack(msg) => write!(f, "Failed to merge audio track: {}", msg),
            CaptureError::Recorder(msg) => write!(f, "Failed to start recorder: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Errors that abort a batch. Already-collected artifacts are discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchError {
    /// A batch is already in progress on this orchestrator.
    AlreadyRunning,
    /// A manual capture is active, so a batch run cannot claim the recorder.
    CaptureBusy,
    /// Starting the capture for a run failed.
    Capture { run: u32, source: CaptureError },
    /// A cooperative wait failed.
    Timer(String),
    /// Fewer artifacts arrived than runs were recorded.
    MissingArtifacts { expected: u32, received: u32 },
    /// The batch shape cannot be scheduled (negative, NaN or oversized waits).
    InvalidSettings(String),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::AlreadyRunning => write!(f, "A batch is already running"),
            BatchError::CaptureBusy => write!(f, "A capture is already active"),
            BatchError::Capture { run, source } => {
                write!(f, "Capture failed on run {}: {}", run + 1, source)
            }
            BatchError::Timer(msg) => write!(f, "Batch wait failed: {}", msg),
            BatchError::MissingArtifacts { expected, received } => write!(
                f,
                "Expected {} recordings but only {} were finalized",
                expected, received
            ),
            BatchError::InvalidSettings(msg) => write!(f, "Invalid batch settings: {}", msg),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::Capture { source, .. } => Some(source),
            _ => None,
        }
    }
}

