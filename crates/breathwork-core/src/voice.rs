//! Voice and audio cue dispatch for one breathing session.
//!
//! The dispatcher decides *what* to say or play; a [`CueSink`] decides how.
//! Each session builds its own dispatcher, so sessions and tests never share
//! speech state.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::exercise::{CueTiming, VoiceCue};
use crate::storage::{UserSettings, VoiceConfig};
use crate::timer::Phase;

const INHALE_PHRASES: &[&str] = &[
    "Breathe in through your nose",
    "Inhale slowly",
    "Breathe in",
    "Draw in a deep breath",
];
const HOLD_IN_PHRASES: &[&str] = &["Hold", "Hold your breath", "Pause and hold", "Retain the breath"];
const EXHALE_PHRASES: &[&str] = &[
    "Slowly exhale",
    "Breathe out",
    "Release the breath",
    "Exhale fully",
];
const HOLD_OUT_PHRASES: &[&str] = &["Hold empty", "Stay empty", "Pause", "Wait"];
const REST_PHRASES: &[&str] = &["Rest and breathe naturally", "Take a moment", "Relax"];

/// Stock phrases spoken when a phase begins.
pub fn phrases_for(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Inhale => INHALE_PHRASES,
        Phase::HoldIn => HOLD_IN_PHRASES,
        Phase::Exhale => EXHALE_PHRASES,
        Phase::HoldOut => HOLD_OUT_PHRASES,
        Phase::Rest => REST_PHRASES,
    }
}

/// A single instruction for the speech/audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cue {
    /// Cancel whatever is playing, then speak `text`.
    Speak {
        text: String,
        volume: f64,
        rate: f64,
        pitch: f64,
    },
    /// Gentle 528Hz chime.
    Bell { volume: f64 },
    /// Short 800Hz click.
    Tick { volume: f64 },
    /// Stop speaking.
    Silence,
}

/// Output side of the dispatcher; implemented by whatever plays audio.
pub trait CueSink: Send {
    fn emit(&mut self, cue: Cue);
}

/// Sink that writes cues to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CueSink for LogSink {
    fn emit(&mut self, cue: Cue) {
        match cue {
            Cue::Speak { text, .. } => tracing::info!(%text, "voice cue"),
            Cue::Bell { volume } => tracing::debug!(volume, "bell"),
            Cue::Tick { volume } => tracing::trace!(volume, "tick"),
            Cue::Silence => tracing::trace!("silence"),
        }
    }
}

impl<F> CueSink for F
where
    F: FnMut(Cue) + Send,
{
    fn emit(&mut self, cue: Cue) {
        self(cue)
    }
}

/// Everything the dispatcher needs to know about the listener's preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub enabled: bool,
    /// 0.0 ..= 1.0
    pub volume: f64,
    pub rate: f64,
    pub pitch: f64,
    /// Bell volume relative to `volume`.
    pub bell_volume_factor: f64,
    pub tick_volume: f64,
}

impl VoiceSettings {
    pub fn from_parts(user: &UserSettings, voice: &VoiceConfig) -> Self {
        Self {
            enabled: user.voice_enabled,
            volume: user.voice_volume,
            rate: voice.rate,
            pitch: voice.pitch,
            bell_volume_factor: voice.bell_volume_factor,
            tick_volume: voice.tick_volume,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from_parts(&UserSettings::default(), &VoiceConfig::default())
    }
}

/// Session-scoped voice cue dispatcher.
///
/// Dropping it stops any speech still in flight.
pub struct VoiceCueDispatcher<S: CueSink> {
    settings: VoiceSettings,
    sink: S,
    custom: HashMap<Phase, String>,
    rng: StdRng,
    active: bool,
}

impl<S: CueSink> VoiceCueDispatcher<S> {
    pub fn new(settings: VoiceSettings, sink: S) -> Self {
        Self {
            settings,
            sink,
            custom: HashMap::new(),
            rng: StdRng::from_entropy(),
            active: false,
        }
    }

    /// Deterministic phrase selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Use an exercise's own wording for phase announcements. Only cues
    /// meant for the start of a phase replace the stock phrases.
    pub fn with_custom_cues(mut self, cues: &[VoiceCue]) -> Self {
        for cue in cues {
            if matches!(cue.timing, None | Some(CueTiming::Start)) {
                self.custom.entry(cue.phase).or_insert_with(|| cue.text.clone());
            }
        }
        self
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    pub fn announce_exercise_start(&mut self, exercise_name: &str) {
        let text = format!("Starting {exercise_name}. Find a comfortable position.");
        self.speak(text, 0.85);
    }

    /// Speak the cue for `phase`; a bell also marks the start of each inhale.
    pub fn announce_phase(&mut self, phase: Phase) {
        if !self.settings.enabled {
            return;
        }
        let text = match self.custom.get(&phase) {
            Some(text) => text.clone(),
            None => phrases_for(phase)
                .choose(&mut self.rng)
                .map(|s| (*s).to_string())
                .unwrap_or_default(),
        };
        let rate = self.settings.rate;
        self.speak(text, rate);
        if phase == Phase::Inhale {
            self.bell();
        }
    }

    /// Transition chime after `cycle` of `total` finished.
    pub fn cycle_complete(&mut self, cycle: u32, total: u32) {
        if !self.settings.enabled {
            return;
        }
        self.bell();
        if cycle < total {
            self.speak(format!("Cycle {cycle} complete"), 1.0);
        }
    }

    pub fn announce_complete(&mut self) {
        self.speak("Exercise complete. Well done.".to_string(), 0.9);
    }

    /// Count down the final five seconds; other values are ignored.
    pub fn countdown(&mut self, seconds: u32) {
        if (1..=5).contains(&seconds) {
            self.speak(seconds.to_string(), 1.1);
        }
    }

    pub fn tick_sound(&mut self) {
        if self.settings.enabled {
            let volume = clamp_volume(self.settings.tick_volume);
            self.emit(Cue::Tick { volume });
        }
    }

    /// Stop any speech in flight.
    pub fn stop(&mut self) {
        if self.active {
            self.sink.emit(Cue::Silence);
            self.active = false;
        }
    }

    fn speak(&mut self, text: String, rate: f64) {
        if !self.settings.enabled || text.is_empty() {
            return;
        }
        let cue = Cue::Speak {
            text,
            volume: clamp_volume(self.settings.volume),
            rate,
            pitch: self.settings.pitch,
        };
        self.emit(cue);
    }

    fn bell(&mut self) {
        let volume = clamp_volume(self.settings.volume * self.settings.bell_volume_factor);
        self.emit(Cue::Bell { volume });
    }

    fn emit(&mut self, cue: Cue) {
        self.active = true;
        self.sink.emit(cue);
    }
}

impl<S: CueSink> Drop for VoiceCueDispatcher<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: CueSink> std::fmt::Debug for VoiceCueDispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCueDispatcher")
            .field("settings", &self.settings)
            .field("custom", &self.custom)
            .field("active", &self.active)
            .finish()
    }
}

fn clamp_volume(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
