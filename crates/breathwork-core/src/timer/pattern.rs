use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One segment of a breath cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
    /// Never part of a derived sequence; used by cue tables only.
    Rest,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Inhale => "inhale",
            Phase::HoldIn => "hold-in",
            Phase::Exhale => "exhale",
            Phase::HoldOut => "hold-out",
            Phase::Rest => "rest",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-phase durations in seconds for one exercise.
///
/// Hold phases are optional; a hold of `0` or `None` is dropped from the
/// sequence entirely rather than run with zero duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathPattern {
    pub inhale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_in: Option<f64>,
    pub exhale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_out: Option<f64>,
}

impl BreathPattern {
    /// Plain inhale/exhale pattern.
    pub fn new(inhale: f64, exhale: f64) -> Self {
        Self {
            inhale,
            hold_in: None,
            exhale,
            hold_out: None,
        }
    }

    /// Four-phase pattern; pass `0.0` to omit a hold.
    pub fn with_holds(inhale: f64, hold_in: f64, exhale: f64, hold_out: f64) -> Self {
        Self {
            inhale,
            hold_in: Some(hold_in),
            exhale,
            hold_out: Some(hold_out),
        }
    }

    /// Check the construction contract.
    ///
    /// # Errors
    /// Returns an error if `inhale` or `exhale` is not finite or rounds to
    /// less than one millisecond, or if a hold is negative or not finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (phase, value) in [("inhale", self.inhale), ("exhale", self.exhale)] {
            if !value.is_finite() || secs_to_ms(value) == 0 {
                return Err(ValidationError::NonPositiveDuration { phase, value });
            }
        }
        for (phase, value) in [("hold-in", self.hold_in), ("hold-out", self.hold_out)] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ValidationError::NegativeDuration { phase, value });
                }
            }
        }
        Ok(())
    }

    /// Duration of `phase` in seconds. Omitted phases and `Rest` are 0.
    pub fn duration_of(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::HoldIn => self.hold_in.unwrap_or(0.0),
            Phase::Exhale => self.exhale,
            Phase::HoldOut => self.hold_out.unwrap_or(0.0),
            Phase::Rest => 0.0,
        }
    }

    /// Duration of `phase` in whole milliseconds.
    pub fn duration_ms(&self, phase: Phase) -> u64 {
        secs_to_ms(self.duration_of(phase))
    }

    /// Ordered phases that make up one cycle of this pattern. Holds shorter
    /// than half a millisecond are left out.
    pub fn phase_sequence(&self) -> PhaseSequence {
        let mut phases = vec![Phase::Inhale];
        if self.duration_ms(Phase::HoldIn) > 0 {
            phases.push(Phase::HoldIn);
        }
        phases.push(Phase::Exhale);
        if self.duration_ms(Phase::HoldOut) > 0 {
            phases.push(Phase::HoldOut);
        }
        PhaseSequence { phases }
    }

    /// Length of one full cycle in seconds.
    pub fn cycle_secs(&self) -> f64 {
        self.phase_sequence()
            .iter()
            .map(|p| self.duration_of(p))
            .sum()
    }
}

/// Phases included for a given pattern, in order.
///
/// Always 2..=4 entries, always starting with `Inhale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSequence {
    phases: Vec<Phase>,
}

impl PhaseSequence {
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn as_slice(&self) -> &[Phase] {
        &self.phases
    }

    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        self.phases.iter().copied()
    }

    /// Phase following `current`, and whether the sequence wrapped to index 0.
    ///
    /// A phase that is not part of the sequence is treated as the last one,
    /// so the next phase is always `Inhale` of a new cycle.
    pub fn next(&self, current: Phase) -> (Phase, bool) {
        let next_index = match self.phases.iter().position(|p| *p == current) {
            Some(i) => (i + 1) % self.phases.len(),
            None => 0,
        };
        (self.phases[next_index], next_index == 0)
    }
}

pub(crate) fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn inhale_exhale_only_sequence() {
        let seq = BreathPattern::new(4.0, 4.0).phase_sequence();
        assert_eq!(seq.as_slice(), &[Phase::Inhale, Phase::Exhale]);
    }

    #[test]
    fn zero_holds_are_dropped() {
        let seq = BreathPattern::with_holds(4.0, 0.0, 6.0, 0.0).phase_sequence();
        assert_eq!(seq.as_slice(), &[Phase::Inhale, Phase::Exhale]);
    }

    #[test]
    fn only_hold_out() {
        let seq = BreathPattern::with_holds(4.0, 0.0, 6.0, 2.0).phase_sequence();
        assert_eq!(
            seq.as_slice(),
            &[Phase::Inhale, Phase::Exhale, Phase::HoldOut]
        );
    }

    #[test]
    fn next_wraps_after_last_phase() {
        let seq = BreathPattern::with_holds(4.0, 4.0, 4.0, 4.0).phase_sequence();
        assert_eq!(seq.next(Phase::Inhale), (Phase::HoldIn, false));
        assert_eq!(seq.next(Phase::HoldOut), (Phase::Inhale, true));
    }

    #[test]
    fn validate_rejects_zero_inhale() {
        let err = BreathPattern::new(0.0, 4.0).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonPositiveDuration {
                phase: "inhale",
                value: 0.0
            }
        );
    }

    #[test]
    fn validate_rejects_negative_hold_and_nan() {
        assert!(BreathPattern::with_holds(4.0, -1.0, 4.0, 0.0)
            .validate()
            .is_err());
        assert!(BreathPattern::new(f64::NAN, 4.0).validate().is_err());
        assert!(BreathPattern::new(4.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn validate_rejects_required_phase_below_one_ms() {
        let err = BreathPattern::new(0.0004, 4.0).validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonPositiveDuration {
                phase: "inhale",
                value: 0.0004
            }
        );
        assert!(BreathPattern::new(4.0, 0.0001).validate().is_err());
        assert!(BreathPattern::new(0.001, 4.0).validate().is_ok());
    }

    #[test]
    fn sub_ms_holds_are_dropped() {
        let pattern = BreathPattern::with_holds(4.0, 0.0004, 4.0, 0.0002);
        assert!(pattern.validate().is_ok());
        assert_eq!(
            pattern.phase_sequence().as_slice(),
            &[Phase::Inhale, Phase::Exhale]
        );
        assert_eq!(pattern.cycle_secs(), 8.0);
    }

    #[test]
    fn deserializes_catalog_shape() {
        let p: BreathPattern =
            serde_json::from_str(r#"{"inhale":4,"holdIn":7,"exhale":8}"#).unwrap();
        assert_eq!(p.hold_in, Some(7.0));
        assert_eq!(p.hold_out, None);
        assert_eq!(p.cycle_secs(), 19.0);
    }

    #[test]
    fn fractional_seconds_round_to_ms() {
        let p = BreathPattern::new(1.25, 0.3333);
        assert_eq!(p.duration_ms(Phase::Inhale), 1250);
        assert_eq!(p.duration_ms(Phase::Exhale), 333);
        assert_eq!(p.duration_ms(Phase::Rest), 0);
    }

    proptest! {
        #[test]
        fn sequence_shape_holds_for_any_valid_pattern(
            inhale in 0.1f64..30.0,
            hold_in in 0.0f64..30.0,
            exhale in 0.1f64..30.0,
            hold_out in 0.0f64..30.0,
        ) {
            let pattern = BreathPattern::with_holds(inhale, hold_in, exhale, hold_out);
            prop_assert!(pattern.validate().is_ok());
            let seq = pattern.phase_sequence();
            prop_assert!((2..=4).contains(&seq.len()));
            prop_assert_eq!(seq.as_slice()[0], Phase::Inhale);
            prop_assert!(seq.iter().all(|p| pattern.duration_of(p) > 0.0));
            prop_assert_eq!(seq.as_slice().contains(&Phase::HoldIn), secs_to_ms(hold_in) > 0);
            prop_assert_eq!(seq.as_slice().contains(&Phase::HoldOut), secs_to_ms(hold_out) > 0);
            prop_assert!(seq.iter().all(|p| pattern.duration_ms(p) > 0));
        }
    }
}
