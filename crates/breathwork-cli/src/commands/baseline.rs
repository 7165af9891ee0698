use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use breathwork_core::baseline::{
    bolt_score, breath_rate, co2_tolerance, rate_bolt, rate_co2, BREATH_RATE_TEST_SECS,
};
use breathwork_core::storage::{BaselineMetrics, ProgressStore};
use breathwork_core::{TestResult, TestType};

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum BaselineAction {
    /// Score a BOLT breath-hold
    Bolt {
        /// Seconds held after a normal exhale
        seconds: f64,
        /// Store the result as the baseline BOLT score
        #[arg(long)]
        save: bool,
    },
    /// Score a slow-exhale CO2 tolerance test
    Co2 {
        /// Seconds of the slowest full exhale
        seconds: f64,
        #[arg(long)]
        save: bool,
    },
    /// Compute resting breaths per minute
    BreathRate {
        /// Breaths counted
        breaths: u32,
        /// Seconds the count ran for
        #[arg(long, default_value_t = BREATH_RATE_TEST_SECS)]
        elapsed: f64,
        #[arg(long)]
        save: bool,
    },
    /// Show the stored baseline
    Show,
}

pub fn run(action: BaselineAction) -> CmdResult {
    let (result, rating, save) = match action {
        BaselineAction::Bolt { seconds, save } => {
            let score = bolt_score(seconds)?;
            (TestResult::new(TestType::Bolt, score), Some(rate_bolt(score)), save)
        }
        BaselineAction::Co2 { seconds, save } => {
            let score = co2_tolerance(seconds)?;
            (TestResult::new(TestType::Co2, score), Some(rate_co2(score)), save)
        }
        BaselineAction::BreathRate {
            breaths,
            elapsed,
            save,
        } => {
            let rate = breath_rate(breaths, elapsed, BREATH_RATE_TEST_SECS)?;
            (TestResult::new(TestType::BreathRate, rate), None, save)
        }
        BaselineAction::Show => {
            let store = ProgressStore::open()?;
            let progress = store.load()?;
            return print_json(&json!({
                "baselineCompleted": progress.baseline_completed,
                "baselineMetrics": progress.baseline_metrics,
            }));
        }
    };

    if save {
        let store = ProgressStore::open()?;
        let current = store.load()?.baseline_metrics;
        let mut metrics = BaselineMetrics::from_results(std::slice::from_ref(&result));
        metrics.bolt_score = metrics.bolt_score.or(current.bolt_score);
        metrics.co2_tolerance = metrics.co2_tolerance.or(current.co2_tolerance);
        metrics.resting_breath_rate = metrics.resting_breath_rate.or(current.resting_breath_rate);
        metrics.tested_at = Some(Utc::now());
        store.save_baseline(metrics)?;
        tracing::info!(test = ?result.test_type, value = result.value, "baseline saved");
    }

    print_json(&json!({
        "result": result,
        "rating": rating.map(|r| r.to_string()),
        "saved": save,
    }))
}
