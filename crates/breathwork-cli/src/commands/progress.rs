use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use breathwork_core::storage::{ProgressStore, StateShiftLog, StateShiftScenario, WeeklyMetrics};

use super::{parse_enum, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Summary of the program so far
    Show,
    /// Mark onboarding as done
    Onboard,
    /// Print the current program day
    Day,
    /// Move on to the next program day
    Advance,
    /// List exercises completed on a program day
    Completed {
        /// Program day (defaults to today's)
        #[arg(long)]
        day: Option<u32>,
    },
    /// Record the weekly check-in
    Checkin {
        #[arg(long)]
        week: u32,
        #[arg(long)]
        bolt: u32,
        #[arg(long)]
        co2: u32,
        #[arg(long)]
        breath_rate: u32,
        /// 1 to 10
        #[arg(long)]
        sleep: u8,
        /// 1 to 10
        #[arg(long)]
        stress: u8,
        /// 1 to 10
        #[arg(long)]
        focus: u8,
        /// 1 to 10
        #[arg(long)]
        energy: u8,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the check-in for a week
    Week { week: u32 },
    /// Log use of a state-shift exercise
    Shift {
        /// pre-meeting, energy-boost, post-workout, sleep-prep, stress-reset,
        /// pre-performance, anxiety-relief or focus-boost
        #[arg(value_parser = parse_enum::<StateShiftScenario>)]
        scenario: StateShiftScenario,
        exercise_id: String,
        /// 1 to 5
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Export all progress as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace all progress with an exported JSON file
    Import { path: PathBuf },
    /// Delete all progress
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: ProgressAction) -> CmdResult {
    let store = ProgressStore::open()?;

    match action {
        ProgressAction::Show => {
            print_json(&store.load()?.summary(Utc::now()))?;
        }
        ProgressAction::Onboard => {
            store.complete_onboarding()?;
            println!("onboarding complete");
        }
        ProgressAction::Day => {
            println!("{}", store.calculate_current_day(Utc::now())?);
        }
        ProgressAction::Advance => {
            println!("{}", store.advance_day()?);
        }
        ProgressAction::Completed { day } => {
            let day = match day {
                Some(day) => day,
                None => store.calculate_current_day(Utc::now())?,
            };
            print_json(&store.completed_for_day(day)?)?;
        }
        ProgressAction::Checkin {
            week,
            bolt,
            co2,
            breath_rate,
            sleep,
            stress,
            focus,
            energy,
            notes,
        } => {
            let metrics = WeeklyMetrics {
                week,
                recorded_at: Utc::now(),
                bolt_score: bolt,
                co2_tolerance: co2,
                resting_breath_rate: breath_rate,
                sleep_quality: sleep,
                stress_recovery: stress,
                focus_duration: focus,
                energy_levels: energy,
                notes,
            };
            store.save_weekly_metrics(metrics)?;
            println!("week {week} check-in saved");
        }
        ProgressAction::Week { week } => match store.weekly_metrics(week)? {
            Some(metrics) => print_json(&metrics)?,
            None => return Err(format!("no check-in recorded for week {week}").into()),
        },
        ProgressAction::Shift {
            scenario,
            exercise_id,
            rating,
            notes,
        } => {
            let progress = store.log_state_shift(StateShiftLog {
                scenario,
                exercise_id,
                used_at: Utc::now(),
                effectiveness_rating: rating,
                notes,
            })?;
            print_json(&json!({ "logged": progress.state_shift_logs.len() }))?;
        }
        ProgressAction::Export { output } => {
            let json = store.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        ProgressAction::Import { path } => {
            let json = std::fs::read_to_string(&path)?;
            let progress = store.import_json(&json)?;
            print_json(&progress.summary(Utc::now()))?;
        }
        ProgressAction::Reset { yes } => {
            if !yes {
                return Err("refusing to delete progress without --yes".into());
            }
            store.reset()?;
            println!("progress reset");
        }
    }
    Ok(())
}
