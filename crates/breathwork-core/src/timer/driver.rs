//! Real-time tick driver for [`BreathingPhaseTimer`].
//!
//! The timer is moved into a single tokio task that is its only mutator.
//! Controls arrive over an mpsc channel, readers observe a `watch` snapshot,
//! and every timer event is forwarded to an unbounded event stream.
//!
//! Dropping the [`TimerDriver`] aborts the task, so a session that is torn
//! down on any path never leaves a ticking timer behind.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::engine::{BreathingPhaseTimer, TimerState, TimerStatus};
use crate::events::Event;
use crate::storage::TimerConfig;

/// Default tick cadence.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverOptions {
    /// Time between ticks, and the amount each tick takes off the phase.
    pub tick: Duration,
    /// Feed measured wall-clock deltas instead of a fixed increment, so a
    /// slow callback or a suspended process does not stretch the session.
    pub resync_to_clock: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            resync_to_clock: false,
        }
    }
}

impl From<&TimerConfig> for DriverOptions {
    fn from(cfg: &TimerConfig) -> Self {
        Self {
            tick: Duration::from_millis(cfg.tick_ms.max(1)),
            resync_to_clock: cfg.resync_to_clock,
        }
    }
}

/// What the driver publishes to observers after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub phase_duration: f64,
    #[serde(flatten)]
    pub state: TimerState,
}

impl TimerSnapshot {
    fn of(timer: &BreathingPhaseTimer) -> Self {
        Self {
            status: timer.status(),
            phase_duration: timer.phase_duration(),
            state: timer.state(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Start,
    Pause,
    Reset,
    Shutdown,
}

/// Handle to a timer running on the tokio runtime.
#[derive(Debug)]
pub struct TimerDriver {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<TimerSnapshot>,
    events: Option<mpsc::UnboundedReceiver<Event>>,
    task: Option<JoinHandle<BreathingPhaseTimer>>,
}

impl TimerDriver {
    /// Move `timer` onto a dedicated task. Must be called inside a tokio runtime.
    pub fn spawn(timer: BreathingPhaseTimer, options: DriverOptions) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(TimerSnapshot::of(&timer));

        tracing::debug!(
            tick_ms = options.tick.as_millis() as u64,
            resync = options.resync_to_clock,
            "spawning timer driver"
        );
        let task = tokio::spawn(drive(timer, options, cmd_rx, snap_tx, event_tx));

        Self {
            commands: cmd_tx,
            snapshots: snap_rx,
            events: Some(event_rx),
            task: Some(task),
        }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    /// Take the event stream. Only the first call returns `Some`.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.events.take()
    }

    /// Wait until the session completes. Returns `None` if the driver task
    /// ended first.
    pub async fn completed(&self) -> Option<TimerSnapshot> {
        let mut rx = self.snapshots.clone();
        let done = rx
            .wait_for(|s| s.status == TimerStatus::Completed)
            .await
            .ok()
            .map(|s| s.clone());
        done
    }

    /// Stop the tick task and hand the timer back.
    pub async fn shutdown(mut self) -> Option<BreathingPhaseTimer> {
        self.send(Command::Shutdown);
        let task = self.task.take()?;
        match task.await {
            Ok(timer) => Some(timer),
            Err(e) => {
                tracing::warn!(error = %e, "timer driver task ended abnormally");
                None
            }
        }
    }

    fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            tracing::debug!(?cmd, "timer driver already stopped");
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(
    mut timer: BreathingPhaseTimer,
    options: DriverOptions,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<TimerSnapshot>,
    events: mpsc::UnboundedSender<Event>,
) -> BreathingPhaseTimer {
    let mut interval = tokio::time::interval(options.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut carry = Duration::ZERO;

    loop {
        let produced: Vec<Event> = tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Start) => {
                    let event = timer.start();
                    if event.is_some() {
                        interval.reset();
                        last_tick = Instant::now();
                        carry = Duration::ZERO;
                    }
                    event.into_iter().collect()
                }
                Some(Command::Pause) => timer.pause().into_iter().collect(),
                Some(Command::Reset) => timer.reset().into_iter().collect(),
                Some(Command::Shutdown) | None => break,
            },
            _ = interval.tick(), if timer.is_running() => {
                if options.resync_to_clock {
                    let now = Instant::now();
                    let (produced, left) = timer.advance(now - last_tick + carry, options.tick);
                    last_tick = now;
                    carry = left;
                    produced
                } else {
                    timer.tick(options.tick)
                }
            }
        };

        snapshots.send_replace(TimerSnapshot::of(&timer));
        for event in produced {
            // The consumer may have stopped listening; the session goes on.
            let _ = events.send(event);
        }
    }

    tracing::debug!(status = ?timer.status(), "timer driver stopped");
    timer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{BreathPattern, Phase};

    fn driver(pattern: BreathPattern, cycles: u32) -> TimerDriver {
        let timer = BreathingPhaseTimer::new(pattern, cycles).unwrap();
        TimerDriver::spawn(timer, DriverOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn runs_two_cycles_to_completion() {
        let mut driver = driver(BreathPattern::new(4.0, 4.0), 2);
        let mut events = driver.take_events().unwrap();
        assert!(driver.take_events().is_none());

        driver.start();
        let done = driver.completed().await.unwrap();
        assert_eq!(done.state.elapsed, 16.0);
        assert!(!done.state.is_running);

        let timer = driver.shutdown().await.unwrap();
        assert_eq!(timer.status(), TimerStatus::Completed);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                Event::TimerStarted { .. } => "start".to_string(),
                Event::PhaseChanged { phase, .. } => phase.to_string(),
                Event::CycleCompleted { cycle, .. } => format!("cycle {cycle}"),
                Event::ExerciseCompleted { .. } => "done".to_string(),
                other => panic!("unexpected event {other:?}"),
            });
        }
        assert_eq!(
            kinds,
            ["start", "exhale", "cycle 1", "inhale", "exhale", "done"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_countdown() {
        let driver = driver(BreathPattern::new(4.0, 4.0), 1);
        driver.start();
        tokio::time::sleep(Duration::from_millis(1050)).await;
        driver.pause();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snap = driver.snapshot();
        assert_eq!(snap.status, TimerStatus::Paused);
        assert_eq!(snap.state.phase_time_remaining, 3.0);
        assert_eq!(snap.state.elapsed, 1.0);

        driver.start();
        tokio::time::sleep(Duration::from_millis(3050)).await;
        let snap = driver.snapshot();
        assert_eq!(snap.state.current_phase, Phase::Exhale);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_idle() {
        let driver = driver(BreathPattern::new(2.0, 2.0), 3);
        driver.start();
        tokio::time::sleep(Duration::from_millis(2550)).await;
        driver.reset();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let snap = driver.snapshot();
        assert_eq!(snap.status, TimerStatus::Idle);
        assert_eq!(snap.state.current_phase, Phase::Inhale);
        assert_eq!(snap.state.phase_time_remaining, 2.0);
        assert_eq!(snap.state.elapsed, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_driver_stops_the_task() {
        let driver = driver(BreathPattern::new(4.0, 4.0), 10);
        let mut rx = driver.subscribe();
        driver.start();
        tokio::time::sleep(Duration::from_millis(350)).await;
        drop(driver);

        // Drain pending changes; the sender goes away with the aborted task.
        while rx.changed().await.is_ok() {}
        assert!(rx.has_changed().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn resync_mode_completes_on_schedule() {
        let timer = BreathingPhaseTimer::new(BreathPattern::with_holds(1.0, 0.5, 1.0, 0.5), 2).unwrap();
        let options = DriverOptions {
            tick: DEFAULT_TICK,
            resync_to_clock: true,
        };
        let driver = TimerDriver::spawn(timer, options);
        driver.start();
        let done = driver.completed().await.unwrap();
        assert_eq!(done.state.current_cycle, 2);
        assert_eq!(done.state.elapsed, 6.0);
    }
}
