// src/scoring/weighted.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ScoringError;
use crate::scoring::{ScoreCalculator, TestScores, check_known_tests, clamp_score};

pub const WEIGHTED_ID: &str = "weighted";

/// Weight given to every test by the default configuration.
pub const DEFAULT_WEIGHT: u64 = 100;

/// ```yaml
/// test-weights:
///   A: 200
///   B: 800
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WeightedConfig {
    pub test_weights: BTreeMap<String, u64>,
}

/// Weighted mean; tests missing from the configuration weigh nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedCalculator;

impl WeightedCalculator {
    fn parse(config: &str) -> Result<WeightedConfig, ScoringError> {
        serde_yaml::from_str(config).map_err(|e| ScoringError::InvalidConfig(e.to_string()))
    }
}

impl ScoreCalculator for WeightedCalculator {
    fn id(&self) -> &'static str {
        WEIGHTED_ID
    }

    fn compute_score(&self, config: &str, results: &TestScores) -> Result<f64, ScoringError> {
        let config = Self::parse(config)?;
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (test, score) in results {
            let weight = config.test_weights.get(test).copied().unwrap_or(0) as f64;
            weighted += score * weight;
            total += weight;
        }
        if total == 0.0 {
            return Ok(0.0);
        }
        Ok(clamp_score(weighted / total))
    }

    fn validate_and_normalize(&self, config: &str) -> Result<String, ScoringError> {
        let config = Self::parse(config)?;
        serde_yaml::to_string(&config).map_err(|e| ScoringError::InvalidConfig(e.to_string()))
    }

    fn validate_test_names(&self, config: &str, test_names: &[String]) -> Result<(), ScoringError> {
        let config = Self::parse(config)?;
        check_known_tests(config.test_weights.keys().map(String::as_str), test_names)
    }

    fn default_config(&self, test_names: &[String]) -> String {
        let config = WeightedConfig {
            test_weights: test_names
                .iter()
                .map(|name| (name.clone(), DEFAULT_WEIGHT))
                .collect(),
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
