// src/scoring/mod.rs

//! Score calculators.
//!
//! A calculator turns per-test scores into one exercise score in [0,1],
//! driven by a YAML configuration string stored with the exercise. The
//! calculators are looked up by ID with [`calculator_for`].

pub mod uniform;
pub mod universal;
pub mod weighted;

use std::collections::BTreeMap;

use crate::errors::ScoringError;

pub use uniform::UniformCalculator;
pub use universal::UniversalCalculator;
pub use weighted::WeightedCalculator;

/// Test name -> score in [0,1].
pub type TestScores = BTreeMap<String, f64>;

pub trait ScoreCalculator {
    /// Identifier used to select this calculator.
    fn id(&self) -> &'static str;

    /// Overall score for `results` under `config`, clamped to [0,1].
    fn compute_score(&self, config: &str, results: &TestScores) -> Result<f64, ScoringError>;

    /// Check `config` and return it in canonical form.
    fn validate_and_normalize(&self, config: &str) -> Result<String, ScoringError>;

    fn is_config_valid(&self, config: &str) -> bool {
        self.validate_and_normalize(config).is_ok()
    }

    /// Check that `config` only mentions tests from `test_names`.
    fn validate_test_names(&self, config: &str, test_names: &[String]) -> Result<(), ScoringError>;

    /// Configuration giving every test the same importance.
    fn default_config(&self, test_names: &[String]) -> String;
}

pub const CALCULATOR_IDS: [&str; 3] = [
    uniform::UNIFORM_ID,
    weighted::WEIGHTED_ID,
    universal::UNIVERSAL_ID,
];

pub fn calculator_for(id: &str) -> Result<Box<dyn ScoreCalculator>, ScoringError> {
    match id {
        uniform::UNIFORM_ID => Ok(Box::new(UniformCalculator)),
        weighted::WEIGHTED_ID => Ok(Box::new(WeightedCalculator)),
        universal::UNIVERSAL_ID => Ok(Box::new(UniversalCalculator)),
        other => Err(ScoringError::UnknownCalculator(other.to_string())),
    }
}

/// Clamp to [0,1]; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

pub(crate) fn check_known_tests<'a>(
    names: impl IntoIterator<Item = &'a str>,
    test_names: &[String],
) -> Result<(), ScoringError> {
    for name in names {
        if !test_names.iter().any(|t| t == name) {
            return Err(ScoringError::UnknownTest(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_all_ids() {
        for id in CALCULATOR_IDS {
            assert_eq!(calculator_for(id).unwrap().id(), id);
        }
        assert!(matches!(
            calculator_for("median"),
            Err(ScoringError::UnknownCalculator(_))
        ));
    }

    #[test]
    fn clamp_handles_nan() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(1.5), 1.0);
        assert_eq!(clamp_score(-0.5), 0.0);
    }
}
