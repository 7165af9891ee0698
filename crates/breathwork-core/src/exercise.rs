//! Exercise definitions and the catalog they are loaded from.
//!
//! The catalog content itself lives outside this crate as a JSON document
//! (an array of exercises, or `{"exercises": [...]}`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::timer::{BreathPattern, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseCategory {
    Foundation,
    Activation,
    Recovery,
    Focus,
    Sleep,
    StressRelief,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseIntensity {
    Gentle,
    Moderate,
    Intense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueTiming {
    Start,
    Middle,
    End,
}

/// Exercise-specific wording for a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCue {
    pub phase: Phase,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<CueTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ExerciseCategory,
    pub intensity: ExerciseIntensity,
    pub pattern: BreathPattern,
    pub cycles: u32,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub voice_cues: Vec<VoiceCue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl Exercise {
    /// Pattern and cycle count must be usable by the timer.
    ///
    /// # Errors
    /// Returns an error if the pattern is invalid or `cycles` is 0.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pattern.validate()?;
        if self.cycles == 0 {
            return Err(ValidationError::ZeroCycles(0));
        }
        Ok(())
    }

    /// Uninterrupted length of the exercise in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.pattern.cycle_secs() * f64::from(self.cycles)
    }
}

/// Render whole seconds as `45s`, `3m` or `2m 40s`.
pub fn format_duration(seconds: u64) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    match (mins, secs) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<Exercise>),
    Wrapped { exercises: Vec<Exercise> },
}

/// Read-only set of exercises.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    /// Build a catalog, rejecting exercises the timer could not run.
    ///
    /// # Errors
    /// Returns an error naming the first invalid exercise.
    pub fn new(exercises: Vec<Exercise>) -> Result<Self> {
        for ex in &exercises {
            ex.validate().map_err(|e| ValidationError::InvalidValue {
                field: format!("exercise '{}'", ex.id),
                message: e.to_string(),
            })?;
        }
        Ok(Self { exercises })
    }

    /// # Errors
    /// Returns an error if the document is not valid catalog JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let exercises = match doc {
            CatalogDocument::List(list) => list,
            CatalogDocument::Wrapped { exercises } => exercises,
        };
        Self::new(exercises)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Custom(format!("cannot read catalog {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|ex| ex.id == id)
    }

    pub fn by_category(&self, category: ExerciseCategory) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|ex| ex.category == category)
            .collect()
    }

    pub fn by_intensity(&self, intensity: ExerciseIntensity) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|ex| ex.intensity == intensity)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": "diaphragm-awakening",
            "name": "Diaphragm Awakening",
            "category": "foundation",
            "intensity": "gentle",
            "pattern": { "inhale": 4, "exhale": 4 },
            "cycles": 10,
            "voiceCues": [
                { "phase": "inhale", "text": "Breathe in, let your belly rise", "timing": "start" }
            ]
        },
        {
            "id": "box-breathing",
            "name": "Box Breathing",
            "category": "stress-relief",
            "intensity": "moderate",
            "pattern": { "inhale": 4, "holdIn": 4, "exhale": 4, "holdOut": 4 },
            "cycles": 10,
            "totalDuration": 160
        }
    ]"#;

    #[test]
    fn loads_catalog_and_filters() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        let ex = catalog.get("box-breathing").unwrap();
        assert_eq!(ex.total_duration_secs(), 160.0);
        assert_eq!(catalog.by_category(ExerciseCategory::StressRelief).len(), 1);
        assert_eq!(catalog.by_intensity(ExerciseIntensity::Gentle)[0].id, "diaphragm-awakening");
        assert_eq!(
            catalog.get("diaphragm-awakening").unwrap().voice_cues[0].timing,
            Some(CueTiming::Start)
        );
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn wrapped_document_is_accepted() {
        let json = format!(r#"{{"exercises": {CATALOG}}}"#);
        assert_eq!(Catalog::from_json(&json).unwrap().len(), 2);
    }

    #[test]
    fn invalid_pattern_rejects_catalog() {
        let json = r#"[{"id":"bad","name":"Bad","category":"focus","intensity":"gentle",
            "pattern":{"inhale":0,"exhale":4},"cycles":3}]"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn format_duration_variants() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(180), "3m");
        assert_eq!(format_duration(160), "2m 40s");
        assert_eq!(format_duration(0), "0s");
    }
}
