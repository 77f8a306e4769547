// src/scoring/universal/mod.rs

//! Calculator driven by an arbitrary expression over test results.

pub mod ast;

use crate::errors::ScoringError;
use crate::scoring::{ScoreCalculator, TestScores, check_known_tests, clamp_score};

pub use ast::AstNode;

pub const UNIVERSAL_ID: &str = "universal";

#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalCalculator;

impl UniversalCalculator {
    /// Parse and structurally validate a configuration.
    pub fn parse(config: &str) -> Result<AstNode, ScoringError> {
        let ast: AstNode =
            serde_yaml::from_str(config).map_err(|e| ScoringError::InvalidConfig(e.to_string()))?;
        ast.validate()?;
        Ok(ast)
    }
}

impl ScoreCalculator for UniversalCalculator {
    fn id(&self) -> &'static str {
        UNIVERSAL_ID
    }

    fn compute_score(&self, config: &str, results: &TestScores) -> Result<f64, ScoringError> {
        let ast = Self::parse(config)?;
        Ok(clamp_score(ast.evaluate(results)))
    }

    fn validate_and_normalize(&self, config: &str) -> Result<String, ScoringError> {
        let ast = Self::parse(config)?;
        serde_yaml::to_string(&ast).map_err(|e| ScoringError::InvalidConfig(e.to_string()))
    }

    fn validate_test_names(&self, config: &str, test_names: &[String]) -> Result<(), ScoringError> {
        let ast = Self::parse(config)?;
        check_known_tests(ast.test_names(), test_names)
    }

    fn default_config(&self, test_names: &[String]) -> String {
        let ast = if test_names.is_empty() {
            AstNode::Value { value: 0.0 }
        } else {
            AstNode::Avg {
                children: test_names
                    .iter()
                    .map(|name| AstNode::TestResult { test: name.clone() })
                    .collect(),
            }
        };
        serde_yaml::to_string(&ast).unwrap_or_default()
    }
}
