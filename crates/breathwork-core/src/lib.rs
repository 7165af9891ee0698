//! # Breathwork Core Library
//!
//! Core logic for a guided 30-day breathing program. The CLI binary is a
//! thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: A pure phase/cycle state machine advanced by explicit
//!   `tick(delta)` calls, plus a tokio driver that owns the ticking
//! - **Voice**: Per-session cue dispatcher that turns timer events into
//!   speech, chime and tick instructions for a pluggable sink
//! - **Storage**: SQLite-backed progress document and TOML configuration
//! - **Exercises & Baseline**: Exercise catalog and self-test scoring
//!
//! ## Key Components
//!
//! - [`BreathingPhaseTimer`]: Core timer state machine
//! - [`TimerDriver`]: Async tick loop around a timer
//! - [`VoiceCueDispatcher`]: Session-scoped cue generation
//! - [`ProgressStore`]: Program progress persistence
//! - [`Config`]: Application configuration management

pub mod baseline;
pub mod error;
pub mod events;
pub mod exercise;
pub mod storage;
pub mod timer;
pub mod voice;

pub use baseline::{Rating, TestResult, TestType};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use exercise::{Catalog, Exercise, ExerciseCategory, ExerciseIntensity};
pub use storage::{Config, Database, ProgressStore, UserProgress, UserSettings};
pub use timer::{
    BreathPattern, BreathingPhaseTimer, DriverOptions, Phase, TimerDriver, TimerSnapshot,
    TimerState, TimerStatus,
};
pub use voice::{Cue, CueSink, LogSink, VoiceCueDispatcher, VoiceSettings};
