// src/scoring/universal/ast.rs

//! Expression tree of the universal calculator.
//!
//! ```yaml
//! type: avg
//! children:
//!   - type: test-result
//!     test: A
//!   - type: value
//!     value: 0.5
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::ScoringError;
use crate::scoring::TestScores;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AstNode {
    Value { value: f64 },
    TestResult { test: String },
    Sum { children: Vec<AstNode> },
    Mul { children: Vec<AstNode> },
    Div { children: Vec<AstNode> },
    Sub { children: Vec<AstNode> },
    Min { children: Vec<AstNode> },
    Max { children: Vec<AstNode> },
    Avg { children: Vec<AstNode> },
    Neg { children: Vec<AstNode> },
    Clamp { children: Vec<AstNode> },
}

/// Accepted number of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    AtLeastOne,
    Exactly(usize),
}

impl AstNode {
    pub fn type_name(&self) -> &'static str {
        match self {
            AstNode::Value { .. } => "value",
            AstNode::TestResult { .. } => "test-result",
            AstNode::Sum { .. } => "sum",
            AstNode::Mul { .. } => "mul",
            AstNode::Div { .. } => "div",
            AstNode::Sub { .. } => "sub",
            AstNode::Min { .. } => "min",
            AstNode::Max { .. } => "max",
            AstNode::Avg { .. } => "avg",
            AstNode::Neg { .. } => "neg",
            AstNode::Clamp { .. } => "clamp",
        }
    }

    fn children(&self) -> &[AstNode] {
        match self {
            AstNode::Value { .. } | AstNode::TestResult { .. } => &[],
            AstNode::Sum { children }
            | AstNode::Mul { children }
            | AstNode::Div { children }
            | AstNode::Sub { children }
            | AstNode::Min { children }
            | AstNode::Max { children }
            | AstNode::Avg { children }
            | AstNode::Neg { children }
            | AstNode::Clamp { children } => children,
        }
    }

    fn arity(&self) -> Option<Arity> {
        match self {
            AstNode::Value { .. } | AstNode::TestResult { .. } => None,
            AstNode::Div { .. } | AstNode::Sub { .. } => Some(Arity::Exactly(2)),
            AstNode::Neg { .. } | AstNode::Clamp { .. } => Some(Arity::Exactly(1)),
            _ => Some(Arity::AtLeastOne),
        }
    }

    /// Structural check of the whole tree.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if let AstNode::Value { value } = self {
            if !value.is_finite() {
                return Err(ScoringError::InvalidConfig(format!(
                    "value node holds a non-finite number ({value})"
                )));
            }
        }
        let count = self.children().len();
        let ok = match self.arity() {
            None => true,
            Some(Arity::AtLeastOne) => count >= 1,
            Some(Arity::Exactly(n)) => count == n,
        };
        if !ok {
            return Err(ScoringError::InvalidConfig(format!(
                "'{}' node has {count} children",
                self.type_name()
            )));
        }
        self.children().iter().try_for_each(AstNode::validate)
    }

    /// Names of all tests the tree refers to, in visiting order.
    pub fn test_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_test_names(&mut names);
        names
    }

    fn collect_test_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        if let AstNode::TestResult { test } = self {
            names.push(test);
        }
        for child in self.children() {
            child.collect_test_names(names);
        }
    }

    /// Evaluate against test scores. Tests without a result count as 0.
    ///
    /// Meant for validated trees; a missing operand evaluates to 0.
    pub fn evaluate(&self, results: &TestScores) -> f64 {
        let values = || self.children().iter().map(|c| c.evaluate(results));
        let arg = |i: usize| self.children().get(i).map_or(0.0, |c| c.evaluate(results));
        match self {
            AstNode::Value { value } => *value,
            AstNode::TestResult { test } => results.get(test).copied().unwrap_or(0.0),
            AstNode::Sum { .. } => values().sum(),
            AstNode::Mul { .. } => values().product(),
            AstNode::Div { .. } => {
                let divisor = arg(1);
                if divisor == 0.0 { 0.0 } else { arg(0) / divisor }
            }
            AstNode::Sub { .. } => arg(0) - arg(1),
            AstNode::Min { .. } => values().fold(f64::INFINITY, f64::min),
            AstNode::Max { .. } => values().fold(f64::NEG_INFINITY, f64::max),
            AstNode::Avg { children } if children.is_empty() => 0.0,
            AstNode::Avg { children } => values().sum::<f64>() / children.len() as f64,
            AstNode::Neg { .. } => -arg(0),
            AstNode::Clamp { .. } => arg(0).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> AstNode {
        serde_yaml::from_str(src).unwrap()
    }

    fn scores(pairs: &[(&str, f64)]) -> TestScores {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluates_nested_expressions() {
        let ast = parse(
            r#"
type: sub
children:
  - type: mul
    children:
      - { type: test-result, test: A }
      - { type: value, value: 2 }
  - type: max
    children:
      - { type: test-result, test: B }
      - { type: value, value: 0.1 }
"#,
        );
        ast.validate().unwrap();
        let value = ast.evaluate(&scores(&[("A", 0.5), ("B", 0.25)]));
        assert!((value - 0.75).abs() < 1e-9);
        assert_eq!(ast.test_names(), vec!["A", "B"]);
    }

    #[test]
    fn missing_results_are_zero_and_division_by_zero_is_zero() {
        let ast = parse(
            r#"
type: div
children:
  - { type: value, value: 1 }
  - { type: test-result, test: missing }
"#,
        );
        assert_eq!(ast.evaluate(&TestScores::new()), 0.0);
    }

    #[test]
    fn arity_is_checked() {
        let neg = parse("type: neg\nchildren: []\n");
        assert!(matches!(neg.validate(), Err(ScoringError::InvalidConfig(_))));

        let sub = parse("type: sub\nchildren:\n  - { type: value, value: 1 }\n");
        assert!(sub.validate().is_err());

        let sum = parse("type: sum\nchildren: []\n");
        assert!(sum.validate().is_err());
    }

    #[test]
    fn unknown_node_type_does_not_parse() {
        assert!(serde_yaml::from_str::<AstNode>("type: pow\nchildren: []\n").is_err());
    }
}
