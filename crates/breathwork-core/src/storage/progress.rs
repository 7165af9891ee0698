//! User progress: the single JSON document behind the 30-day program.
//!
//! The whole [`UserProgress`] blob is stored under one key in the
//! [`Database`] kv table, and is exactly what `export_json` / `import_json`
//! exchange.

use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::baseline::TestResult;
use crate::error::{Result, ValidationError};

/// Length of the curriculum in days.
pub const PROGRAM_DAYS: u32 = 30;
/// Number of themed weeks in the curriculum.
pub const PROGRAM_WEEKS: u32 = 4;

const STORAGE_KEY: &str = "breathwork-progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub voice_enabled: bool,
    /// 0.0 ..= 1.0
    pub voice_volume: f64,
    pub haptic_feedback: bool,
    pub reminder_enabled: bool,
    /// `HH:mm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub theme: Theme,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            voice_volume: 0.8,
            haptic_feedback: true,
            reminder_enabled: false,
            reminder_time: None,
            theme: Theme::Dark,
        }
    }
}

impl UserSettings {
    /// # Errors
    /// Returns an error for a volume outside 0..=1 or a malformed reminder time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.voice_volume) {
            return Err(ValidationError::InvalidValue {
                field: "voiceVolume".into(),
                message: format!("{} is outside 0..=1", self.voice_volume),
            });
        }
        if let Some(time) = &self.reminder_time {
            NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| ValidationError::InvalidValue {
                field: "reminderTime".into(),
                message: format!("'{time}' is not HH:mm"),
            })?;
        }
        Ok(())
    }
}

/// Partial settings update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub voice_enabled: Option<bool>,
    pub voice_volume: Option<f64>,
    pub haptic_feedback: Option<bool>,
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<String>,
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    fn apply(self, settings: &mut UserSettings) {
        if let Some(v) = self.voice_enabled {
            settings.voice_enabled = v;
        }
        if let Some(v) = self.voice_volume {
            settings.voice_volume = v;
        }
        if let Some(v) = self.haptic_feedback {
            settings.haptic_feedback = v;
        }
        if let Some(v) = self.reminder_enabled {
            settings.reminder_enabled = v;
        }
        if let Some(v) = self.reminder_time {
            settings.reminder_time = Some(v);
        }
        if let Some(v) = self.theme {
            settings.theme = v;
        }
    }
}

/// Day-0 self-test results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetrics {
    pub bolt_score: Option<u32>,
    pub co2_tolerance: Option<u32>,
    pub resting_breath_rate: Option<u32>,
    pub tested_at: Option<DateTime<Utc>>,
}

impl BaselineMetrics {
    /// Collect individual test results; the latest timestamp wins.
    pub fn from_results(results: &[TestResult]) -> Self {
        use crate::baseline::TestType;

        let mut metrics = Self::default();
        for r in results {
            match r.test_type {
                TestType::Bolt => metrics.bolt_score = Some(r.value),
                TestType::Co2 => metrics.co2_tolerance = Some(r.value),
                TestType::BreathRate => metrics.resting_breath_rate = Some(r.value),
            }
            metrics.tested_at = metrics.tested_at.max(Some(r.timestamp));
        }
        metrics
    }
}

/// Record written when the timer signals completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExercise {
    pub exercise_id: String,
    pub day: u32,
    pub completed_at: DateTime<Utc>,
    /// Seconds the session actually ran.
    pub duration: f64,
    pub cycles_completed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Weekly KPI check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMetrics {
    pub week: u32,
    pub recorded_at: DateTime<Utc>,
    pub bolt_score: u32,
    pub co2_tolerance: u32,
    pub resting_breath_rate: u32,
    /// 1..=10
    pub sleep_quality: u8,
    /// 1..=10
    pub stress_recovery: u8,
    /// 1..=10
    pub focus_duration: u8,
    /// 1..=10
    pub energy_levels: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WeeklyMetrics {
    /// # Errors
    /// Returns an error for week 0 or any subjective rating outside 1..=10.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.week == 0 {
            return Err(ValidationError::InvalidValue {
                field: "week".into(),
                message: "weeks start at 1".into(),
            });
        }
        for (field, value) in [
            ("sleepQuality", self.sleep_quality),
            ("stressRecovery", self.stress_recovery),
            ("focusDuration", self.focus_duration),
            ("energyLevels", self.energy_levels),
        ] {
            check_rating(field, value, 1, 10)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateShiftScenario {
    PreMeeting,
    EnergyBoost,
    PostWorkout,
    SleepPrep,
    StressReset,
    PrePerformance,
    AnxietyRelief,
    FocusBoost,
}

/// One use of the state-shift toolkit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateShiftLog {
    pub scenario: StateShiftScenario,
    pub exercise_id: String,
    pub used_at: DateTime<Utc>,
    /// 1..=5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StateShiftLog {
    /// # Errors
    /// Returns an error for an effectiveness rating outside 1..=5.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(rating) = self.effectiveness_rating {
            check_rating("effectivenessRating", rating, 1, 5)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub current_day: u32,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub completed_exercises: Vec<CompletedExercise>,
    #[serde(default)]
    pub baseline_metrics: BaselineMetrics,
    #[serde(default)]
    pub weekly_metrics: Vec<WeeklyMetrics>,
    #[serde(default)]
    pub state_shift_logs: Vec<StateShiftLog>,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub baseline_completed: bool,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            current_day: 0,
            start_date: Utc::now(),
            completed_exercises: Vec::new(),
            baseline_metrics: BaselineMetrics::default(),
            weekly_metrics: Vec::new(),
            state_shift_logs: Vec::new(),
            settings: UserSettings::default(),
            onboarding_completed: false,
            baseline_completed: false,
        }
    }
}

impl UserProgress {
    /// Program day derived from the start date: 0 before the baseline is
    /// recorded, otherwise whole days since start plus one, within 1..=30.
    pub fn program_day(&self, now: DateTime<Utc>) -> u32 {
        if !self.baseline_completed {
            return 0;
        }
        let days = (now - self.start_date).num_days() + 1;
        days.clamp(1, i64::from(PROGRAM_DAYS)) as u32
    }

    pub fn completed_for_day(&self, day: u32) -> Vec<&CompletedExercise> {
        self.completed_exercises
            .iter()
            .filter(|ex| ex.day == day)
            .collect()
    }

    pub fn summary(&self, now: DateTime<Utc>) -> ProgressSummary {
        let current_day = self.program_day(now);
        let mut days: Vec<u32> = self.completed_exercises.iter().map(|ex| ex.day).collect();
        days.sort_unstable();
        days.dedup();
        ProgressSummary {
            current_day,
            current_week: program_week(current_day),
            completed_sessions: self.completed_exercises.len(),
            total_practice_secs: self.completed_exercises.iter().map(|ex| ex.duration).sum(),
            days_practiced: days.len(),
            weekly_checkins: self.weekly_metrics.len(),
            onboarding_completed: self.onboarding_completed,
            baseline_completed: self.baseline_completed,
        }
    }

    /// # Errors
    /// Returns the first invalid field found anywhere in the document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.current_day > PROGRAM_DAYS {
            return Err(ValidationError::InvalidValue {
                field: "currentDay".into(),
                message: format!("{} is beyond day {PROGRAM_DAYS}", self.current_day),
            });
        }
        self.settings.validate()?;
        for m in &self.weekly_metrics {
            m.validate()?;
        }
        for log in &self.state_shift_logs {
            log.validate()?;
        }
        Ok(())
    }
}

/// Week of the program a day belongs to (days 29 and 30 stay in week 4).
pub fn program_week(day: u32) -> u32 {
    day.div_ceil(7).clamp(1, PROGRAM_WEEKS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub current_day: u32,
    pub current_week: u32,
    pub completed_sessions: usize,
    pub total_practice_secs: f64,
    pub days_practiced: usize,
    pub weekly_checkins: usize,
    pub onboarding_completed: bool,
    pub baseline_completed: bool,
}

/// Load-modify-save access to the progress document.
pub struct ProgressStore {
    db: Database,
}

impl ProgressStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the store in the default data directory.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?))
    }

    /// Current progress, or a fresh document if none is stored.
    ///
    /// A stored document that no longer parses is logged and replaced by a
    /// fresh one rather than blocking the app.
    ///
    /// # Errors
    /// Returns an error only if the database read fails.
    pub fn load(&self) -> Result<UserProgress> {
        match self.db.kv_get(STORAGE_KEY)? {
            Some(json) => match serde_json::from_str::<UserProgress>(&json) {
                Ok(progress) => Ok(progress),
                Err(e) => {
                    tracing::error!(error = %e, "stored progress is unreadable; starting fresh");
                    Ok(UserProgress::default())
                }
            },
            None => Ok(UserProgress::default()),
        }
    }

    /// # Errors
    /// Returns an error if the document cannot be serialized or written.
    pub fn save(&self, progress: &UserProgress) -> Result<()> {
        let json = serde_json::to_string(progress)?;
        self.db.kv_set(STORAGE_KEY, &json)?;
        Ok(())
    }

    /// Apply `f` to the stored document and persist the result.
    ///
    /// # Errors
    /// Returns an error if loading, `f`, or saving fails. Nothing is
    /// written when `f` fails.
    pub fn update<F>(&self, f: F) -> Result<UserProgress>
    where
        F: FnOnce(&mut UserProgress) -> Result<()>,
    {
        let mut progress = self.load()?;
        f(&mut progress)?;
        self.save(&progress)?;
        Ok(progress)
    }

    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn complete_onboarding(&self) -> Result<UserProgress> {
        self.update(|p| {
            p.onboarding_completed = true;
            Ok(())
        })
    }

    /// Store day-0 results and start the 30-day clock.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn save_baseline(&self, metrics: BaselineMetrics) -> Result<UserProgress> {
        self.update(|p| {
            p.baseline_metrics = metrics;
            p.baseline_completed = true;
            p.current_day = 1;
            p.start_date = Utc::now();
            Ok(())
        })
    }

    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn record_completed_exercise(&self, exercise: CompletedExercise) -> Result<UserProgress> {
        tracing::info!(
            exercise = %exercise.exercise_id,
            day = exercise.day,
            duration = exercise.duration,
            "recording completed exercise"
        );
        self.update(|p| {
            p.completed_exercises.push(exercise);
            Ok(())
        })
    }

    /// Whether `exercise_id` was completed for `day` on the same local
    /// calendar date as `now`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn is_exercise_completed_today(
        &self,
        exercise_id: &str,
        day: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let today = now.with_timezone(&Local).date_naive();
        Ok(self.load()?.completed_exercises.iter().any(|ex| {
            ex.exercise_id == exercise_id
                && ex.day == day
                && ex.completed_at.with_timezone(&Local).date_naive() == today
        }))
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn completed_for_day(&self, day: u32) -> Result<Vec<CompletedExercise>> {
        Ok(self
            .load()?
            .completed_for_day(day)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Insert or replace the check-in for `metrics.week`.
    ///
    /// # Errors
    /// Returns an error if the metrics are invalid or the store fails.
    pub fn save_weekly_metrics(&self, metrics: WeeklyMetrics) -> Result<UserProgress> {
        metrics.validate()?;
        self.update(|p| {
            match p.weekly_metrics.iter_mut().find(|m| m.week == metrics.week) {
                Some(existing) => *existing = metrics,
                None => p.weekly_metrics.push(metrics),
            }
            Ok(())
        })
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn weekly_metrics(&self, week: u32) -> Result<Option<WeeklyMetrics>> {
        Ok(self
            .load()?
            .weekly_metrics
            .into_iter()
            .find(|m| m.week == week))
    }

    /// # Errors
    /// Returns an error if the log is invalid or the store fails.
    pub fn log_state_shift(&self, log: StateShiftLog) -> Result<UserProgress> {
        log.validate()?;
        self.update(|p| {
            p.state_shift_logs.push(log);
            Ok(())
        })
    }

    /// # Errors
    /// Returns an error if the patched settings are invalid or the store fails.
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<UserSettings> {
        let progress = self.update(|p| {
            let mut settings = p.settings.clone();
            patch.apply(&mut settings);
            settings.validate()?;
            p.settings = settings;
            Ok(())
        })?;
        Ok(progress.settings)
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn settings(&self) -> Result<UserSettings> {
        Ok(self.load()?.settings)
    }

    /// Move to the next program day, never past day 30.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn advance_day(&self) -> Result<u32> {
        let progress = self.update(|p| {
            p.current_day = (p.current_day + 1).min(PROGRAM_DAYS);
            Ok(())
        })?;
        Ok(progress.current_day)
    }

    /// Stored day counter.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn current_day(&self) -> Result<u32> {
        Ok(self.load()?.current_day)
    }

    /// Day derived from the start date; see [`UserProgress::program_day`].
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn calculate_current_day(&self, now: DateTime<Utc>) -> Result<u32> {
        Ok(self.load()?.program_day(now))
    }

    /// Forget all progress.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn reset(&self) -> Result<()> {
        if self.db.kv_delete(STORAGE_KEY)? {
            tracing::info!("progress reset");
        }
        Ok(())
    }

    /// Pretty-printed JSON of the whole document.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.load()?)?)
    }

    /// Replace the stored document with `json`.
    ///
    /// # Errors
    /// Returns an error, leaving the stored document untouched, if `json`
    /// is not a valid progress document.
    pub fn import_json(&self, json: &str) -> Result<UserProgress> {
        let progress: UserProgress = serde_json::from_str(json)?;
        progress.validate()?;
        self.save(&progress)?;
        Ok(progress)
    }
}

fn check_rating(field: &'static str, value: u8, min: u8, max: u8) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
