mod driver;
mod engine;
mod pattern;

pub use driver::{DriverOptions, TimerDriver, TimerSnapshot, DEFAULT_TICK};
pub use engine::{BreathingPhaseTimer, TimerState, TimerStatus};
pub use pattern::{BreathPattern, Phase, PhaseSequence};
