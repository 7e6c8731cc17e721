//! Simulation settings and preferences
//!
//! Persisted in LocalStorage on the web; the native binary reads them from an
//! optional JSON file.

use serde::{Deserialize, Serialize};

use crate::batch::BatchSettings;
use crate::consts::CAPTURE_FRAME_RATE;
use crate::tuning::TuningParameters;

/// Recording format preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Frames per second requested from the surface stream
    pub frame_rate: u32,
    /// Container/codec requested from the recorder
    pub mime_type: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frame_rate: CAPTURE_FRAME_RATE,
            mime_type: "video/webm".to_string(),
        }
    }
}

/// All user-adjustable settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tuning: TuningParameters,
    pub batch: BatchSettings,
    pub capture: CaptureSettings,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Silence the collision chime (speakers and recordings)
    pub muted: bool,
}

impl Settings {
    /// LocalStorage key
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "bounce_loop_settings";

    /// Parse settings; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Capture frame rate, never zero
    pub fn frame_rate(&self) -> u32 {
        self.capture.frame_rate.max(1)
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
