mod config;
pub mod database;
pub mod progress;

pub use config::{Config, TimerConfig, VoiceConfig};
pub use database::Database;
pub use progress::{
    program_week, BaselineMetrics, CompletedExercise, ProgressStore, ProgressSummary,
    SettingsPatch, StateShiftLog, StateShiftScenario, Theme, UserProgress, UserSettings,
    WeeklyMetrics, PROGRAM_DAYS, PROGRAM_WEEKS,
};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the directory holding `config.toml` and `breathwork.db`.
///
/// `BREATHWORK_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/breathwork/`, or `~/.config/breathwork-dev/` when
/// `BREATHWORK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("BREATHWORK_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREATHWORK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathwork-dev")
            } else {
                base_dir.join("breathwork")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
