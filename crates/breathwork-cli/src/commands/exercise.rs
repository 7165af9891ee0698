use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Subcommand};

use breathwork_core::exercise::{format_duration, ExerciseCategory, ExerciseIntensity};
use breathwork_core::storage::{CompletedExercise, ProgressStore, PROGRAM_DAYS};
use breathwork_core::{
    BreathPattern, BreathingPhaseTimer, Catalog, Config, Cue, CueSink, DriverOptions, Event,
    Exercise, LogSink, TimerDriver, VoiceCueDispatcher, VoiceSettings,
};

use super::{parse_enum, print_json, CmdResult};

type BoxedSink = Box<dyn FnMut(Cue) + Send>;
type SharedVoice = Arc<Mutex<VoiceCueDispatcher<BoxedSink>>>;

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// Run a session in real time, printing timer events as JSON lines
    Run(RunArgs),
    /// Show one exercise from a catalog
    Info {
        /// Exercise catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
        id: String,
    },
    /// List exercises in a catalog
    List {
        #[arg(long)]
        catalog: PathBuf,
        /// e.g. foundation, stress-relief
        #[arg(long, value_parser = parse_enum::<ExerciseCategory>)]
        category: Option<ExerciseCategory>,
        /// gentle, moderate or intense
        #[arg(long, value_parser = parse_enum::<ExerciseIntensity>)]
        intensity: Option<ExerciseIntensity>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Exercise catalog JSON file
    #[arg(long, requires = "id")]
    catalog: Option<PathBuf>,
    /// Exercise id within the catalog
    #[arg(long, requires = "catalog")]
    id: Option<String>,
    /// Inhale seconds (ad-hoc pattern)
    #[arg(long, default_value_t = 4.0, conflicts_with = "catalog")]
    inhale: f64,
    /// Hold-after-inhale seconds
    #[arg(long, conflicts_with = "catalog")]
    hold_in: Option<f64>,
    /// Exhale seconds
    #[arg(long, default_value_t = 4.0, conflicts_with = "catalog")]
    exhale: f64,
    /// Hold-after-exhale seconds
    #[arg(long, conflicts_with = "catalog")]
    hold_out: Option<f64>,
    #[arg(long, default_value_t = 10, conflicts_with = "catalog")]
    cycles: u32,
    /// Skip the spoken countdown before the first inhale
    #[arg(long)]
    no_delay: bool,
    /// Print voice cues as JSON lines instead of logging them
    #[arg(long)]
    cues: bool,
    /// Don't record the session in progress
    #[arg(long)]
    no_record: bool,
    /// Program day to record the session under (defaults to the stored day)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(PROGRAM_DAYS)))]
    day: Option<u32>,
}

pub fn run(action: ExerciseAction) -> CmdResult {
    match action {
        ExerciseAction::Run(args) => run_session(args),
        ExerciseAction::Info { catalog, id } => {
            let catalog = Catalog::load(&catalog)?;
            let exercise = catalog
                .get(&id)
                .ok_or_else(|| format!("no exercise '{id}' in catalog"))?;
            let mut value = serde_json::to_value(exercise)?;
            value["totalDuration"] =
                format_duration(exercise.total_duration_secs().round() as u64).into();
            print_json(&value)
        }
        ExerciseAction::List {
            catalog,
            category,
            intensity,
        } => {
            let catalog = Catalog::load(&catalog)?;
            for ex in catalog.iter().filter(|ex| {
                category.map_or(true, |c| ex.category == c)
                    && intensity.map_or(true, |i| ex.intensity == i)
            }) {
                println!(
                    "{}\t{}\t{}",
                    ex.id,
                    ex.name,
                    format_duration(ex.total_duration_secs().round() as u64)
                );
            }
            Ok(())
        }
    }
}

fn resolve_exercise(args: &RunArgs) -> Result<Exercise, Box<dyn std::error::Error>> {
    if let (Some(path), Some(id)) = (&args.catalog, &args.id) {
        let catalog = Catalog::load(path)?;
        return catalog
            .get(id)
            .cloned()
            .ok_or_else(|| format!("no exercise '{id}' in catalog").into());
    }

    let pattern = BreathPattern {
        inhale: args.inhale,
        hold_in: args.hold_in,
        exhale: args.exhale,
        hold_out: args.hold_out,
    };
    let exercise = Exercise {
        id: "custom".into(),
        name: "Custom pattern".into(),
        description: String::new(),
        category: ExerciseCategory::Foundation,
        intensity: ExerciseIntensity::Gentle,
        pattern,
        cycles: args.cycles,
        instructions: Vec::new(),
        benefits: Vec::new(),
        voice_cues: Vec::new(),
        special_instructions: None,
    };
    exercise.validate()?;
    Ok(exercise)
}

/// Day a finished session counts towards: the requested day, else the
/// stored program day, else day 1.
fn session_day(requested: Option<u32>, stored: u32) -> u32 {
    requested
        .filter(|d| *d > 0)
        .or(Some(stored).filter(|d| *d > 0))
        .unwrap_or(1)
}

fn with_voice(voice: &SharedVoice, f: impl FnOnce(&mut VoiceCueDispatcher<BoxedSink>)) {
    let mut guard = voice.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard);
}

fn run_session(args: RunArgs) -> CmdResult {
    let config = Config::load_or_default();
    let store = ProgressStore::open()?;
    let exercise = resolve_exercise(&args)?;

    let print_cues = args.cues;
    let sink: BoxedSink = Box::new(move |cue: Cue| {
        if print_cues {
            match serde_json::to_string(&cue) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "cannot serialize cue"),
            }
        } else {
            LogSink.emit(cue);
        }
    });
    let settings = VoiceSettings::from_parts(&store.settings()?, &config.voice);
    let voice: SharedVoice = Arc::new(Mutex::new(
        VoiceCueDispatcher::new(settings, sink).with_custom_cues(&exercise.voice_cues),
    ));

    let total = exercise.cycles;
    let timer = BreathingPhaseTimer::new(exercise.pattern, total)?
        .on_phase_change({
            let voice = Arc::clone(&voice);
            move |phase| with_voice(&voice, |v| v.announce_phase(phase))
        })
        .on_cycle_complete({
            let voice = Arc::clone(&voice);
            move |cycle| with_voice(&voice, |v| v.cycle_complete(cycle, total))
        })
        .on_complete({
            let voice = Arc::clone(&voice);
            move || with_voice(&voice, |v| v.announce_complete())
        });

    let start_delay = if args.no_delay {
        Duration::ZERO
    } else {
        Duration::from_millis(config.timer.start_delay_ms)
    };
    let options = DriverOptions::from(&config.timer);

    tracing::info!(exercise = %exercise.id, cycles = total, "starting session");
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome =
        runtime.block_on(drive_session(timer, options, start_delay, &voice, &exercise.name))?;
    with_voice(&voice, |v| v.stop());

    let Some((cycles_completed, elapsed_secs)) = outcome else {
        return Err("session ended before completion".into());
    };
    if !args.no_record {
        let day = session_day(args.day, store.current_day()?);
        store.record_completed_exercise(CompletedExercise {
            exercise_id: exercise.id.clone(),
            day,
            completed_at: Utc::now(),
            duration: elapsed_secs,
            cycles_completed,
            notes: None,
        })?;
    }
    Ok(())
}

/// Run the timer on the driver until it completes, printing each event.
/// Returns the completed cycle count and elapsed seconds.
async fn drive_session(
    timer: BreathingPhaseTimer,
    options: DriverOptions,
    start_delay: Duration,
    voice: &SharedVoice,
    name: &str,
) -> Result<Option<(u32, f64)>, Box<dyn std::error::Error>> {
    with_voice(voice, |v| v.announce_exercise_start(name));

    let mut remaining = start_delay;
    while !remaining.is_zero() {
        let whole = remaining.as_secs_f64().ceil() as u32;
        with_voice(voice, |v| v.countdown(whole));
        let step = remaining.saturating_sub(Duration::from_secs(u64::from(whole - 1)));
        tokio::time::sleep(step).await;
        remaining -= step;
    }

    let first_phase = timer.current_phase();
    let mut driver = TimerDriver::spawn(timer, options);
    let mut events = driver
        .take_events()
        .ok_or("timer event stream unavailable")?;
    driver.start();
    with_voice(voice, |v| v.announce_phase(first_phase));

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
        if let Event::ExerciseCompleted {
            cycles,
            elapsed_secs,
            ..
        } = event
        {
            outcome = Some((cycles, elapsed_secs));
            break;
        }
    }

    driver.shutdown().await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_day_prefers_request_then_stored_then_one() {
        assert_eq!(session_day(Some(5), 3), 5);
        assert_eq!(session_day(None, 3), 3);
        assert_eq!(session_day(None, 0), 1);
        assert_eq!(session_day(Some(0), 0), 1);
    }
}
