//! Collision chime using Web Audio API
//!
//! Each bounce plays a short procedurally generated ping, stepping up a
//! pentatonic scale. The ping goes to the speakers and to the capture
//! destination so recordings carry the same sound.

/// Major pentatonic steps in semitones from the root
const PENTATONIC: [i32; 5] = [0, 2, 4, 7, 9];
/// Root note (C5)
const ROOT_HZ: f32 = 523.25;
/// Octaves climbed before wrapping back to the root
const OCTAVES: usize = 2;

/// Walks the scale one note per collision
#[derive(Debug, Clone, Default)]
pub struct ChimeScale {
    step: usize,
}

impl ChimeScale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frequency of the current note, then advance
    pub fn next_frequency(&mut self) -> f32 {
        let freq = note_frequency(self.step);
        self.step = (self.step + 1) % (PENTATONIC.len() * OCTAVES);
        freq
    }

    /// Back to the first note
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

/// Frequency of scale step `step` (wraps after `OCTAVES` octaves)
pub fn note_frequency(step: usize) -> f32 {
    let step = step % (PENTATONIC.len() * OCTAVES);
    let octave = (step / PENTATONIC.len()) as i32;
    let semitones = PENTATONIC[step % PENTATONIC.len()] + 12 * octave;
    ROOT_HZ * 2f32.powf(semitones as f32 / 12.0)
}

#[cfg(target_arch = "wasm32")]
pub use web::CollisionChime;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{
        AudioContext, GainNode, MediaStreamAudioDestinationNode, OscillatorNode, OscillatorType,
    };

    use super::ChimeScale;

    const CHIME_VOLUME: f32 = 0.5;

    /// Ping player routed to the speakers and the capture destination
    pub struct CollisionChime {
        ctx: AudioContext,
        capture: MediaStreamAudioDestinationNode,
        scale: ChimeScale,
        muted: bool,
    }

    impl CollisionChime {
        pub fn new(ctx: AudioContext, capture: MediaStreamAudioDestinationNode) -> Self {
            Self {
                ctx,
                capture,
                scale: ChimeScale::new(),
                muted: false,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            let _ = self.ctx.resume();
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        pub fn is_muted(&self) -> bool {
            self.muted
        }

        /// Start the next run from the first note
        pub fn reset(&mut self) {
            self.scale.reset();
        }

        /// Play the next note of the scale
        pub fn play(&mut self) {
            let freq = self.scale.next_frequency();
            if self.muted {
                return;
            }

            // Resume context if suspended (browsers require user gesture)
            if self.ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = self.ctx.resume();
            }

            let Some((osc, gain)) = self.create_osc(freq, OscillatorType::Sine) else {
                log::debug!("Chime oscillator unavailable");
                return;
            };
            let t = self.ctx.current_time();

            gain.gain().set_value_at_time(CHIME_VOLUME * 0.4, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.35).ok();

            // Soft overtone an octave up
            if let Some((osc, gain)) = self.create_osc(freq * 2.0, OscillatorType::Triangle) {
                gain.gain().set_value_at_time(CHIME_VOLUME * 0.1, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.15)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.2).ok();
            }
        }

        /// Oscillator -> gain -> (speakers, capture destination)
        fn create_osc(
            &self,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = self.ctx.create_oscillator().ok()?;
            let gain = self.ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&self.ctx.destination()).ok()?;
            gain.connect_with_audio_node(&self.capture).ok()?;

            Some((osc, gain))
        }
    }
}
