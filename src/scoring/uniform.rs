// src/scoring/uniform.rs

use crate::errors::ScoringError;
use crate::scoring::{ScoreCalculator, TestScores, clamp_score};

pub const UNIFORM_ID: &str = "uniform";

/// Arithmetic mean of the test scores. Takes no configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCalculator;

impl ScoreCalculator for UniformCalculator {
    fn id(&self) -> &'static str {
        UNIFORM_ID
    }

    fn compute_score(&self, config: &str, results: &TestScores) -> Result<f64, ScoringError> {
        self.validate_and_normalize(config)?;
        if results.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = results.values().sum();
        Ok(clamp_score(sum / results.len() as f64))
    }

    fn validate_and_normalize(&self, config: &str) -> Result<String, ScoringError> {
        if config.trim().is_empty() {
            Ok(String::new())
        } else {
            Err(ScoringError::InvalidConfig(
                "the uniform calculator takes no configuration".to_string(),
            ))
        }
    }

    fn validate_test_names(&self, config: &str, _test_names: &[String]) -> Result<(), ScoringError> {
        self.validate_and_normalize(config).map(|_| ())
    }

    fn default_config(&self, _test_names: &[String]) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> TestScores {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn mean_of_scores() {
        let score = UniformCalculator
            .compute_score("", &scores(&[("A", 1.0), ("B", 0.0)]))
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[test]
    fn no_tests_score_zero() {
        assert_eq!(UniformCalculator.compute_score("", &TestScores::new()).unwrap(), 0.0);
    }

    #[test]
    fn any_config_is_rejected() {
        assert!(!UniformCalculator.is_config_valid("test-weights: {}"));
        assert!(UniformCalculator.is_config_valid("  \n"));
    }
}
