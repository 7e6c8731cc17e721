//! MediaRecorder capture of the canvas stream plus audio (web)
//!
//! The backend owns an `AudioContext` with a `MediaStreamAudioDestinationNode`.
//! Anything connected to that node (the collision chime, a music player) is
//! recorded alongside the canvas frames.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, Blob, BlobEvent, BlobPropertyBag, HtmlCanvasElement, MediaRecorder,
    MediaRecorderOptions, MediaStream, MediaStreamAudioDestinationNode, MediaStreamTrack,
};

use super::session::{ChunkSink, Recorder};
use crate::error::{CaptureError, SetupError};
use crate::renderer::CanvasSurface;

/// Default recording format
pub const WEBM_MIME: &str = "video/webm";

pub struct MediaRecorderBackend {
    canvas: HtmlCanvasElement,
    audio_ctx: AudioContext,
    destination: MediaStreamAudioDestinationNode,
    mime_type: String,
    active: Option<MediaRecorder>,
}

impl MediaRecorderBackend {
    /// Create the audio route for `canvas`; fails if Web Audio is unavailable
    pub fn new(canvas: HtmlCanvasElement, mime_type: &str) -> Result<Self, SetupError> {
        let audio_ctx =
            AudioContext::new().map_err(|e| SetupError::AudioUnavailable(format!("{:?}", e)))?;
        let destination = audio_ctx
            .create_media_stream_destination()
            .map_err(|e| SetupError::AudioUnavailable(format!("{:?}", e)))?;

        Ok(Self {
            canvas,
            audio_ctx,
            destination,
            mime_type: mime_type.to_string(),
            active: None,
        })
    }

    pub fn audio_context(&self) -> &AudioContext {
        &self.audio_ctx
    }

    /// Connect audio nodes here to have them recorded
    pub fn audio_destination(&self) -> &MediaStreamAudioDestinationNode {
        &self.destination
    }
}

/// Copy every audio track of `source` into `target`
fn merge_audio_tracks(target: &MediaStream, source: &MediaStream) -> Result<usize, CaptureError> {
    let tracks = source.get_audio_tracks();
    for track in tracks.iter() {
        let track: MediaStreamTrack = track
            .dyn_into()
            .map_err(|_| CaptureError::AudioTrack("not a MediaStreamTrack".into()))?;
        target.add_track(&track);
    }
    Ok(tracks.length() as usize)
}

/// Join the recorded blobs and read them back as bytes
async fn assemble(parts: Vec<Blob>, mime_type: &str) -> Result<Vec<u8>, JsValue> {
    let sequence = js_sys::Array::new();
    for part in &parts {
        sequence.push(part);
    }
    let bag = BlobPropertyBag::new();
    bag.set_type(mime_type);
    let blob = Blob::new_with_blob_sequence_and_options(&sequence, &bag)?;
    let buffer = JsFuture::from(blob.array_buffer()).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

impl Recorder for MediaRecorderBackend {
    type Surface = CanvasSurface;
    type AudioStream = MediaStream;

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn begin(
        &mut self,
        frame_rate: u32,
        audio: Option<&MediaStream>,
        sink: ChunkSink,
    ) -> Result<(), CaptureError> {
        if !MediaRecorder::is_type_supported(&self.mime_type) {
            return Err(CaptureError::UnsupportedFormat(self.mime_type.clone()));
        }

        let stream = self
            .canvas
            .capture_stream_with_frame_request_rate(frame_rate as f64)
            .map_err(|e| CaptureError::Stream(format!("{:?}", e)))?;

        let mut audio_tracks = merge_audio_tracks(&stream, &self.destination.stream())?;
        if let Some(external) = audio {
            audio_tracks += merge_audio_tracks(&stream, external)?;
        }

        let options = MediaRecorderOptions::new();
        options.set_mime_type(&self.mime_type);
        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(&stream, &options)
                .map_err(|e| CaptureError::Recorder(format!("{:?}", e)))?;

        let parts: Rc<RefCell<Vec<Blob>>> = Rc::new(RefCell::new(Vec::new()));

        let on_data = {
            let parts = parts.clone();
            Closure::<dyn FnMut(BlobEvent)>::new(move |event: BlobEvent| {
                // Zero-length chunks are normal between frames
                if let Some(blob) = event.data() {
                    if blob.size() > 0.0 {
                        parts.borrow_mut().push(blob);
                    }
                }
            })
        };
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        // Stop fires after the final dataavailable; it owns the data handler
        // so both are released together.
        let mime_type = self.mime_type.clone();
        let on_stop = Closure::once_into_js(move |_event: web_sys::Event| {
            drop(on_data);
            let parts = std::mem::take(&mut *parts.borrow_mut());
            wasm_bindgen_futures::spawn_local(async move {
                match assemble(parts, &mime_type).await {
                    Ok(bytes) => sink.push(bytes),
                    Err(e) => log::error!("Failed to assemble recording: {:?}", e),
                }
                sink.finish();
            });
        });
        recorder.set_onstop(Some(on_stop.unchecked_ref()));

        recorder
            .start()
            .map_err(|e| CaptureError::Recorder(format!("{:?}", e)))?;

        log::debug!("MediaRecorder started with {} audio track(s)", audio_tracks);
        self.active = Some(recorder);
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(recorder) = self.active.take() {
            if let Err(e) = recorder.stop() {
                log::error!("MediaRecorder stop failed: {:?}", e);
            }
        }
    }
}
