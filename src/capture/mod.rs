//! Capture module
//!
//! Wraps the rendered surface and an optional audio stream into recorded
//! artifacts. `MediaRecorder` on the web, an NDJSON command log headless.

pub mod headless;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{AudioTrackList, CommandRecorder};
pub use session::{
    CaptureArtifact, CaptureSession, CaptureState, ChunkSink, CompletionCallback, Recorder,
};
#[cfg(target_arch = "wasm32")]
pub use web::MediaRecorderBackend;
