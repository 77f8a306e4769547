// src/errors.rs

//! Crate-wide error types.
//!
//! Each layer has its own enum so callers can match on the failure family:
//! - [`ConfigError`] for pipeline / exercise configuration and compilation,
//! - [`ResultsLoadingError`] for raw results documents,
//! - [`ScoringError`] for score calculator configurations.
//!
//! [`PipejudgeError`] aggregates them for the CLI and other callers that
//! drive the whole flow.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    #[error("port mismatch on box '{box_name}': {reason}")]
    PortMismatch { box_name: String, reason: String },

    #[error("variable conflict on '{variable}': {reason}")]
    VariableConflict { variable: String, reason: String },

    #[error("cycle detected in box graph involving '{0}'")]
    CyclicDependency(String),

    #[error("variable '{variable}' references '${reference}', which is not defined")]
    UnresolvedReference { variable: String, reference: String },

    #[error("wildcard '{pattern}' in variable '{variable}': {reason}")]
    UnmatchedWildcard {
        variable: String,
        pattern: String,
        reason: String,
    },

    #[error("unknown box type '{0}'")]
    UnknownBoxType(String),

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),

    #[error("test '{test}' has no configuration for environment '{environment}'")]
    UnknownEnvironment { test: String, environment: String },

    #[error("configuration error: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn invalid_variable(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidVariable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn port_mismatch(box_name: &str, reason: impl Into<String>) -> Self {
        ConfigError::PortMismatch {
            box_name: box_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn variable_conflict(variable: &str, reason: impl Into<String>) -> Self {
        ConfigError::VariableConflict {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ResultsLoadingError {
    #[error("malformed results document: {0}")]
    Malformed(String),

    #[error("results belong to job '{found}', expected '{expected}'")]
    JobMismatch { expected: String, found: String },

    #[error("task '{task}' declares no limits for hardware group '{hw_group}'")]
    MissingLimits { task: String, hw_group: String },

    #[error("test '{0}' is not declared in the job configuration")]
    UnknownTest(String),

    #[error("malformed test '{test}': {reason}")]
    MalformedTest { test: String, reason: String },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("invalid score configuration: {0}")]
    InvalidConfig(String),

    #[error("score configuration references unknown test '{0}'")]
    UnknownTest(String),

    #[error("unknown score calculator '{0}'")]
    UnknownCalculator(String),
}

#[derive(Error, Debug)]
pub enum PipejudgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Results(#[from] ResultsLoadingError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipejudgeError>;
