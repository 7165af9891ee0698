//! Baseline self-test scoring.
//!
//! The stopwatch screens measure raw seconds and breath counts; this module
//! turns those readings into BOLT score, CO2 tolerance and resting breath rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default length of the resting breath-rate test in seconds.
pub const BREATH_RATE_TEST_SECS: f64 = 60.0;

/// Shortest window a breath rate is computed over.
pub const MIN_BREATH_RATE_WINDOW_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    Bolt,
    Co2,
    BreathRate,
}

impl TestType {
    pub fn unit(&self) -> &'static str {
        match self {
            TestType::Bolt | TestType::Co2 => "seconds",
            TestType::BreathRate => "breaths/min",
        }
    }
}

/// One measured baseline value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_type: TestType,
    pub value: u32,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(test_type: TestType, value: u32) -> Self {
        Self {
            test_type,
            value,
            unit: test_type.unit().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Excellent,
    Good,
    RoomToGrow,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::RoomToGrow => "Room to grow",
        })
    }
}

/// Seconds of comfortable breath-hold after a normal exhale.
///
/// # Errors
/// Returns an error for negative or non-finite readings.
pub fn bolt_score(held_secs: f64) -> Result<u32, ValidationError> {
    round_seconds("bolt", held_secs)
}

/// Seconds of the slowest possible full exhale.
///
/// # Errors
/// Returns an error for negative or non-finite readings.
pub fn co2_tolerance(exhale_secs: f64) -> Result<u32, ValidationError> {
    round_seconds("co2", exhale_secs)
}

/// Breaths per minute over the shorter of `elapsed_secs` and `window_secs`.
///
/// # Errors
/// Returns [`ValidationError::WindowTooShort`] when the effective window is
/// below [`MIN_BREATH_RATE_WINDOW_SECS`].
pub fn breath_rate(
    breath_count: u32,
    elapsed_secs: f64,
    window_secs: f64,
) -> Result<u32, ValidationError> {
    let effective = elapsed_secs.min(window_secs);
    if !effective.is_finite() || effective < MIN_BREATH_RATE_WINDOW_SECS {
        return Err(ValidationError::WindowTooShort {
            elapsed_secs: effective,
            min_secs: MIN_BREATH_RATE_WINDOW_SECS,
        });
    }
    Ok((f64::from(breath_count) / effective * 60.0).round() as u32)
}

pub fn rate_bolt(score: u32) -> Rating {
    match score {
        40.. => Rating::Excellent,
        25..=39 => Rating::Good,
        _ => Rating::RoomToGrow,
    }
}

pub fn rate_co2(score: u32) -> Rating {
    match score {
        80.. => Rating::Excellent,
        60..=79 => Rating::Good,
        _ => Rating::RoomToGrow,
    }
}

fn round_seconds(field: &str, secs: f64) -> Result<u32, ValidationError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("{secs} is not a valid duration in seconds"),
        });
    }
    Ok(secs.round() as u32)
}
