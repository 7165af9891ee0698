use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerStatus};

/// Every state change of a breathing session produces an Event.
/// The CLI prints them; the voice dispatcher and progress store react to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        cycle: u32,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase_remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase_remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A new phase began. Fired after any cycle-level event of the same tick.
    PhaseChanged {
        phase: Phase,
        cycle: u32,
        duration_secs: f64,
        at: DateTime<Utc>,
    },
    /// `cycle` is the number of the cycle that just finished.
    CycleCompleted {
        cycle: u32,
        at: DateTime<Utc>,
    },
    ExerciseCompleted {
        cycles: u32,
        elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        phase: Phase,
        phase_remaining_secs: f64,
        phase_duration_secs: f64,
        cycle: u32,
        total_cycles: u32,
        elapsed_secs: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Wall-clock time the event was produced.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerResumed { at, .. }
            | Event::TimerReset { at }
            | Event::PhaseChanged { at, .. }
            | Event::CycleCompleted { at, .. }
            | Event::ExerciseCompleted { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}
