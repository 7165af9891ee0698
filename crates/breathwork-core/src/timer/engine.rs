//! Breathing phase timer.
//!
//! A pure state machine over a [`BreathPattern`]. It has no internal thread
//! and never reads a clock: the caller feeds it time with [`BreathingPhaseTimer::tick`].
//! [`super::driver`] supplies the real-time cadence.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed        (terminal until reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 2)?
//!     .on_phase_change(|phase| println!("{phase}"));
//! timer.start();
//! timer.tick(Duration::from_millis(100));
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::pattern::{BreathPattern, Phase, PhaseSequence};
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// All cycles finished. Only `reset()` leaves this state.
    Completed,
}

/// Read-only snapshot of a running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub current_phase: Phase,
    /// Seconds left in the current phase.
    pub phase_time_remaining: f64,
    pub current_cycle: u32,
    pub total_cycles: u32,
    /// Seconds the timer has spent running.
    pub elapsed: f64,
}

type PhaseCallback = Box<dyn FnMut(Phase) + Send>;
type CycleCallback = Box<dyn FnMut(u32) + Send>;
type CompleteCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct Callbacks {
    on_phase_change: Option<PhaseCallback>,
    on_cycle_complete: Option<CycleCallback>,
    on_complete: Option<CompleteCallback>,
}

impl Callbacks {
    /// Invoke the callback matching `event`. A panicking callback is logged
    /// and swallowed so the session keeps ticking.
    fn dispatch(&mut self, event: &Event) {
        let (name, outcome) = match event {
            Event::PhaseChanged { phase, .. } => match self.on_phase_change.as_mut() {
                Some(cb) => ("on_phase_change", catch_unwind(AssertUnwindSafe(|| cb(*phase)))),
                None => return,
            },
            Event::CycleCompleted { cycle, .. } => match self.on_cycle_complete.as_mut() {
                Some(cb) => ("on_cycle_complete", catch_unwind(AssertUnwindSafe(|| cb(*cycle)))),
                None => return,
            },
            Event::ExerciseCompleted { .. } => match self.on_complete.as_mut() {
                Some(cb) => ("on_complete", catch_unwind(AssertUnwindSafe(|| cb()))),
                None => return,
            },
            _ => return,
        };
        if let Err(payload) = outcome {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(callback = name, %message, "timer callback panicked; continuing");
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_phase_change", &self.on_phase_change.is_some())
            .field("on_cycle_complete", &self.on_cycle_complete.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Phase sequencing, countdown and completion signalling for one exercise.
///
/// Time is kept in whole milliseconds so repeated 100ms ticks never drift
/// across a phase boundary.
#[derive(Debug)]
pub struct BreathingPhaseTimer {
    pattern: BreathPattern,
    sequence: PhaseSequence,
    total_cycles: u32,
    status: TimerStatus,
    phase: Phase,
    phase_remaining_ms: u64,
    cycle: u32,
    elapsed_ms: u64,
    callbacks: Callbacks,
}

impl BreathingPhaseTimer {
    /// Create an idle timer positioned at the start of the first inhale.
    ///
    /// # Errors
    /// Returns an error if the pattern is invalid or `total_cycles` is 0.
    pub fn new(pattern: BreathPattern, total_cycles: u32) -> Result<Self, ValidationError> {
        pattern.validate()?;
        if total_cycles == 0 {
            return Err(ValidationError::ZeroCycles(total_cycles));
        }
        Ok(Self {
            sequence: pattern.phase_sequence(),
            phase_remaining_ms: pattern.duration_ms(Phase::Inhale),
            pattern,
            total_cycles,
            status: TimerStatus::Idle,
            phase: Phase::Inhale,
            cycle: 1,
            elapsed_ms: 0,
            callbacks: Callbacks::default(),
        })
    }

    pub fn on_phase_change(mut self, f: impl FnMut(Phase) + Send + 'static) -> Self {
        self.callbacks.on_phase_change = Some(Box::new(f));
        self
    }

    /// Receives the number of the cycle that just finished.
    pub fn on_cycle_complete(mut self, f: impl FnMut(u32) + Send + 'static) -> Self {
        self.callbacks.on_cycle_complete = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.callbacks.on_complete = Some(Box::new(f));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    pub fn current_cycle(&self) -> u32 {
        self.cycle
    }

    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    pub fn phase_remaining_ms(&self) -> u64 {
        self.phase_remaining_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn pattern(&self) -> &BreathPattern {
        &self.pattern
    }

    pub fn sequence(&self) -> &PhaseSequence {
        &self.sequence
    }

    /// Duration in seconds of the current phase.
    pub fn phase_duration(&self) -> f64 {
        self.pattern.duration_of(self.phase)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        let total = self.pattern.duration_ms(self.phase);
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.phase_remaining_ms.min(total) as f64 / total as f64)
    }

    /// Expected session length in seconds if nothing is paused.
    pub fn estimated_total_secs(&self) -> f64 {
        self.pattern.cycle_secs() * f64::from(self.total_cycles)
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            is_running: self.is_running(),
            current_phase: self.phase,
            phase_time_remaining: ms_to_secs(self.phase_remaining_ms),
            current_cycle: self.cycle,
            total_cycles: self.total_cycles,
            elapsed: ms_to_secs(self.elapsed_ms),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            status: self.status,
            phase: self.phase,
            phase_remaining_secs: ms_to_secs(self.phase_remaining_ms),
            phase_duration_secs: self.phase_duration(),
            cycle: self.cycle,
            total_cycles: self.total_cycles,
            elapsed_secs: ms_to_secs(self.elapsed_ms),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin or resume counting down. No-op while running or once completed.
    pub fn start(&mut self) -> Option<Event> {
        match self.status {
            TimerStatus::Idle => {
                self.status = TimerStatus::Running;
                Some(Event::TimerStarted {
                    phase: self.phase,
                    cycle: self.cycle,
                    total_cycles: self.total_cycles,
                    at: Utc::now(),
                })
            }
            TimerStatus::Paused => {
                self.status = TimerStatus::Running;
                Some(Event::TimerResumed {
                    phase_remaining_ms: self.phase_remaining_ms,
                    at: Utc::now(),
                })
            }
            TimerStatus::Running | TimerStatus::Completed => None,
        }
    }

    /// Freeze the countdown in place. No-op unless running.
    pub fn pause(&mut self) -> Option<Event> {
        match self.status {
            TimerStatus::Running => {
                self.status = TimerStatus::Paused;
                Some(Event::TimerPaused {
                    phase_remaining_ms: self.phase_remaining_ms,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Stop and return to the first inhale of cycle 1. Legal from any state.
    pub fn reset(&mut self) -> Option<Event> {
        self.status = TimerStatus::Idle;
        self.phase = Phase::Inhale;
        self.phase_remaining_ms = self.pattern.duration_ms(Phase::Inhale);
        self.cycle = 1;
        self.elapsed_ms = 0;
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// Advance by one tick of `delta`. Does nothing unless running.
    ///
    /// At most one phase boundary is crossed per tick; a phase is complete
    /// once its remaining time falls within half a tick of zero. Returned
    /// events are in callback order: cycle-level events precede the
    /// `PhaseChanged` that opens the next cycle.
    pub fn tick(&mut self, delta: Duration) -> Vec<Event> {
        if self.status != TimerStatus::Running {
            return Vec::new();
        }

        let step_ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        let epsilon_ms = step_ms / 2;
        let remaining = self.phase_remaining_ms.saturating_sub(step_ms);
        let mut events = Vec::new();
        let mut finished = false;
        let now = Utc::now();

        if remaining <= epsilon_ms {
            let (next_phase, new_cycle) = self.sequence.next(self.phase);
            if new_cycle {
                let next_cycle = self.cycle + 1;
                if next_cycle > self.total_cycles {
                    self.status = TimerStatus::Completed;
                    self.phase_remaining_ms = 0;
                    finished = true;
                } else {
                    events.push(Event::CycleCompleted {
                        cycle: self.cycle,
                        at: now,
                    });
                    self.cycle = next_cycle;
                }
            }
            if !finished {
                self.phase = next_phase;
                self.phase_remaining_ms = self.pattern.duration_ms(next_phase);
                events.push(Event::PhaseChanged {
                    phase: next_phase,
                    cycle: self.cycle,
                    duration_secs: self.pattern.duration_of(next_phase),
                    at: now,
                });
            }
        } else {
            self.phase_remaining_ms = remaining;
        }

        self.elapsed_ms = self.elapsed_ms.saturating_add(step_ms);

        if finished {
            tracing::debug!(
                cycles = self.total_cycles,
                elapsed_ms = self.elapsed_ms,
                "breathing exercise completed"
            );
            events.push(Event::ExerciseCompleted {
                cycles: self.total_cycles,
                elapsed_secs: ms_to_secs(self.elapsed_ms),
                at: now,
            });
        }

        // State is fully committed before any callback runs.
        for event in &events {
            self.callbacks.dispatch(event);
        }
        events
    }

    /// Feed `elapsed` wall-clock time as a series of `step` ticks.
    ///
    /// Returns the events produced and the leftover time shorter than one
    /// step, which the caller should carry into the next call. Stops early
    /// if the session completes or is paused by a callback.
    pub fn advance(&mut self, elapsed: Duration, step: Duration) -> (Vec<Event>, Duration) {
        if step.is_zero() {
            return (self.tick(elapsed), Duration::ZERO);
        }
        let mut events = Vec::new();
        let mut left = elapsed;
        while left >= step && self.is_running() {
            events.extend(self.tick(step));
            left -= step;
        }
        if !self.is_running() {
            left = Duration::ZERO;
        }
        (events, left)
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const TICK: Duration = Duration::from_millis(100);

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Phase(Phase),
        Cycle(u32),
        Done,
    }

    type Log = Arc<Mutex<Vec<(u64, Seen)>>>;
    type Clock = Arc<Mutex<u64>>;

    /// Timer whose callbacks record what fired and at which tick number.
    fn recording_timer(pattern: BreathPattern, cycles: u32) -> (BreathingPhaseTimer, Log, Clock) {
        let log: Log = Arc::default();
        let clock: Clock = Arc::default();
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let (c1, c2, c3) = (clock.clone(), clock.clone(), clock.clone());
        let timer = BreathingPhaseTimer::new(pattern, cycles)
            .unwrap()
            .on_phase_change(move |p| {
                let t = *c1.lock().unwrap();
                l1.lock().unwrap().push((t, Seen::Phase(p)));
            })
            .on_cycle_complete(move |c| {
                let t = *c2.lock().unwrap();
                l2.lock().unwrap().push((t, Seen::Cycle(c)));
            })
            .on_complete(move || {
                let t = *c3.lock().unwrap();
                l3.lock().unwrap().push((t, Seen::Done));
            });
        (timer, log, clock)
    }

    fn run_to_completion(timer: &mut BreathingPhaseTimer, clock: &Clock, max_ticks: u64) -> u64 {
        for i in 1..=max_ticks {
            *clock.lock().unwrap() = i;
            timer.tick(TICK);
            if timer.status() == TimerStatus::Completed {
                return i;
            }
        }
        panic!("timer did not complete within {max_ticks} ticks");
    }

    #[test]
    fn initial_state_matches_pattern() {
        let timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 6.0), 3).unwrap();
        assert_eq!(
            timer.state(),
            TimerState {
                is_running: false,
                current_phase: Phase::Inhale,
                phase_time_remaining: 4.0,
                current_cycle: 1,
                total_cycles: 3,
                elapsed: 0.0,
            }
        );
        assert_eq!(timer.phase_duration(), 4.0);
        assert_eq!(timer.estimated_total_secs(), 30.0);
    }

    #[test]
    fn construction_rejects_bad_input() {
        assert!(BreathingPhaseTimer::new(BreathPattern::new(0.0, 4.0), 1).is_err());
        assert!(BreathingPhaseTimer::new(BreathPattern::new(4.0, -2.0), 1).is_err());
        assert!(matches!(
            BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 0),
            Err(ValidationError::ZeroCycles(0))
        ));
    }

    #[test]
    fn two_cycle_inhale_exhale_scenario() {
        let (mut timer, log, clock) = recording_timer(BreathPattern::new(4.0, 4.0), 2);
        timer.start();
        let ticks = run_to_completion(&mut timer, &clock, 1000);
        assert_eq!(ticks, 160);
        assert_eq!(timer.elapsed_ms(), 16_000);

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                (40, Seen::Phase(Phase::Exhale)),
                (80, Seen::Cycle(1)),
                (80, Seen::Phase(Phase::Inhale)),
                (120, Seen::Phase(Phase::Exhale)),
                (160, Seen::Done),
            ]
        );
        let state = timer.state();
        assert!(!state.is_running);
        assert_eq!(state.current_cycle, 2);
        assert_eq!(state.current_phase, Phase::Exhale);
    }

    #[test]
    fn single_cycle_box_breathing_never_reports_cycle_complete() {
        let (mut timer, log, clock) = recording_timer(BreathPattern::with_holds(4.0, 4.0, 4.0, 4.0), 1);
        timer.start();
        let ticks = run_to_completion(&mut timer, &clock, 1000);
        assert_eq!(ticks, 160);

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                (40, Seen::Phase(Phase::HoldIn)),
                (80, Seen::Phase(Phase::Exhale)),
                (120, Seen::Phase(Phase::HoldOut)),
                (160, Seen::Done),
            ]
        );
    }

    #[test]
    fn tick_events_mirror_callback_order() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(0.2, 0.2), 2).unwrap();
        timer.start();
        assert!(timer.tick(TICK).is_empty());
        assert!(matches!(
            timer.tick(TICK).as_slice(),
            [Event::PhaseChanged { phase: Phase::Exhale, cycle: 1, .. }]
        ));
        timer.tick(TICK);
        let events = timer.tick(TICK);
        assert!(matches!(
            events.as_slice(),
            [
                Event::CycleCompleted { cycle: 1, .. },
                Event::PhaseChanged { phase: Phase::Inhale, cycle: 2, .. }
            ]
        ));
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 1).unwrap();
        assert!(timer.tick(TICK).is_empty());
        assert_eq!(timer.phase_remaining_ms(), 4000);
        assert_eq!(timer.elapsed_ms(), 0);
    }

    #[test]
    fn pause_then_start_resumes_in_place() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 1).unwrap();
        assert!(matches!(timer.start(), Some(Event::TimerStarted { .. })));
        for _ in 0..13 {
            timer.tick(TICK);
        }
        assert!(matches!(
            timer.pause(),
            Some(Event::TimerPaused { phase_remaining_ms: 2700, .. })
        ));
        assert!(timer.pause().is_none());

        for _ in 0..50 {
            timer.tick(TICK);
        }
        assert_eq!(timer.phase_remaining_ms(), 2700);
        assert_eq!(timer.elapsed_ms(), 1300);

        assert!(matches!(timer.start(), Some(Event::TimerResumed { .. })));
        assert!(timer.start().is_none());
        assert_eq!(timer.current_phase(), Phase::Inhale);
        assert_eq!(timer.phase_remaining_ms(), 2700);
    }

    #[test]
    fn reset_from_any_state_returns_to_initial() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::with_holds(3.0, 1.5, 3.0, 0.0), 2).unwrap();
        let initial = timer.state();

        timer.start();
        for _ in 0..55 {
            timer.tick(TICK);
        }
        timer.reset();
        assert_eq!(timer.state(), initial);

        timer.start();
        timer.advance(Duration::from_secs(60), TICK);
        assert_eq!(timer.status(), TimerStatus::Completed);
        timer.reset();
        assert_eq!(timer.state(), initial);
        assert_eq!(timer.status(), TimerStatus::Idle);
    }

    #[test]
    fn completed_timer_ignores_start_and_ticks() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(0.1, 0.1), 1).unwrap();
        timer.start();
        timer.tick(TICK);
        let events = timer.tick(TICK);
        assert!(matches!(events.as_slice(), [Event::ExerciseCompleted { cycles: 1, .. }]));
        assert_eq!(timer.status(), TimerStatus::Completed);

        assert!(timer.start().is_none());
        assert!(timer.tick(TICK).is_empty());
        assert_eq!(timer.current_cycle(), 1);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_session() {
        let completions = Arc::new(Mutex::new(0));
        let seen = completions.clone();
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(0.5, 0.5), 3)
            .unwrap()
            .on_phase_change(|_| panic!("speech engine unavailable"))
            .on_complete(move || *seen.lock().unwrap() += 1);
        timer.start();
        let (events, _) = timer.advance(Duration::from_secs(10), TICK);

        assert_eq!(timer.status(), TimerStatus::Completed);
        assert_eq!(*completions.lock().unwrap(), 1);
        let cycles = events
            .iter()
            .filter(|e| matches!(e, Event::CycleCompleted { .. }))
            .count();
        assert_eq!(cycles, 2);
    }

    #[test]
    fn advance_carries_partial_step() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 1).unwrap();
        timer.start();
        let (events, carry) = timer.advance(Duration::from_millis(1250), TICK);
        assert!(events.is_empty());
        assert_eq!(carry, Duration::from_millis(50));
        assert_eq!(timer.phase_remaining_ms(), 2800);
    }

    #[test]
    fn phase_progress_tracks_current_phase() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(1.0, 2.0), 1).unwrap();
        assert_eq!(timer.phase_progress(), 0.0);
        timer.start();
        for _ in 0..4 {
            timer.tick(TICK);
        }
        assert!((timer.phase_progress() - 0.4).abs() < 1e-9);

        // Entering exhale restarts progress from zero.
        for _ in 0..6 {
            timer.tick(TICK);
        }
        assert_eq!(timer.current_phase(), Phase::Exhale);
        assert_eq!(timer.phase_progress(), 0.0);
        timer.tick(TICK);
        assert!((timer.phase_progress() - 0.05).abs() < 1e-9);

        // Completion leaves no remaining time; progress stays within 0..=1.
        timer.advance(Duration::from_secs(5), TICK);
        assert_eq!(timer.status(), TimerStatus::Completed);
        assert_eq!(timer.phase_progress(), 1.0);
    }

    #[test]
    fn sub_ms_hold_never_becomes_a_phase() {
        let (mut timer, log, clock) =
            recording_timer(BreathPattern::with_holds(0.2, 0.0004, 0.2, 0.0), 1);
        assert_eq!(timer.sequence().len(), 2);
        timer.start();
        run_to_completion(&mut timer, &clock, 100);
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .all(|(_, seen)| *seen != Seen::Phase(Phase::HoldIn)));
    }

    #[test]
    fn fractional_phase_boundary_fires_once() {
        let mut timer = BreathingPhaseTimer::new(BreathPattern::new(0.35, 0.35), 1).unwrap();
        timer.start();
        let mut changes = 0;
        for _ in 0..3 {
            changes += timer.tick(TICK).len();
        }
        // 350ms - 300ms = 50ms, within half a tick of zero.
        assert_eq!(changes, 1);
        assert_eq!(timer.current_phase(), Phase::Exhale);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let timer = BreathingPhaseTimer::new(BreathPattern::new(4.0, 4.0), 5).unwrap();
        match timer.snapshot() {
            Event::StateSnapshot {
                status,
                phase,
                phase_remaining_secs,
                total_cycles,
                ..
            } => {
                assert_eq!(status, TimerStatus::Idle);
                assert_eq!(phase, Phase::Inhale);
                assert_eq!(phase_remaining_secs, 4.0);
                assert_eq!(total_cycles, 5);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn cycle_and_completion_counts(
                inhale in 1u32..40,
                hold_in in 0u32..20,
                exhale in 1u32..40,
                hold_out in 0u32..20,
                cycles in 1u32..6,
            ) {
                let pattern = BreathPattern::with_holds(
                    f64::from(inhale) / 10.0,
                    f64::from(hold_in) / 10.0,
                    f64::from(exhale) / 10.0,
                    f64::from(hold_out) / 10.0,
                );
                let mut timer = BreathingPhaseTimer::new(pattern, cycles).unwrap();
                timer.start();
                let (events, _) = timer.advance(Duration::from_secs(3600), TICK);

                let cycle_events: Vec<u32> = events.iter().filter_map(|e| match e {
                    Event::CycleCompleted { cycle, .. } => Some(*cycle),
                    _ => None,
                }).collect();
                prop_assert_eq!(cycle_events, (1..cycles).collect::<Vec<_>>());

                let completions = events.iter().filter(|e| matches!(e, Event::ExerciseCompleted { .. })).count();
                prop_assert_eq!(completions, 1);
                prop_assert!(
                    matches!(events.last(), Some(Event::ExerciseCompleted { .. })),
                    "last event must be the completion"
                );

                let phase_changes = events.iter().filter(|e| matches!(e, Event::PhaseChanged { .. })).count();
                let per_cycle = pattern.phase_sequence().len();
                prop_assert_eq!(phase_changes, per_cycle * cycles as usize - 1);

                let state = timer.state();
                prop_assert!(!state.is_running);
                prop_assert_eq!(state.current_cycle, cycles);
                let last = *pattern.phase_sequence().as_slice().last().unwrap();
                prop_assert_eq!(state.current_phase, last);
            }

            #[test]
            fn pause_preserves_remaining(ticks in 0usize..60) {
                let mut timer = BreathingPhaseTimer::new(BreathPattern::with_holds(2.0, 1.0, 2.0, 1.0), 3).unwrap();
                timer.start();
                for _ in 0..ticks {
                    timer.tick(TICK);
                }
                let before = timer.state();
                timer.pause();
                timer.tick(TICK);
                timer.start();
                prop_assert_eq!(timer.state().phase_time_remaining, before.phase_time_remaining);
                prop_assert_eq!(timer.state().current_cycle, before.current_cycle);
                prop_assert_eq!(timer.state().current_phase, before.current_phase);
            }
        }
    }
}
