// src/results/raw.rs

//! Raw results document as returned by the worker.

use serde::{Deserialize, Serialize};

use crate::results::stats::Stats;
use crate::types::TaskStatus;

/// Top level of a results document.
///
/// Every field is optional here so structural problems surface as
/// [`ResultsLoadingError::Malformed`](crate::errors::ResultsLoadingError)
/// rather than as opaque YAML errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawResultsDocument {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub hw_group: Option<String>,
    #[serde(default)]
    pub results: Option<serde_yaml::Value>,
}

/// One entry of the `results` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawTaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub output: TaskOutput,
}

/// Captured output: either one text blob or separate streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Text(String),
    Streams {
        #[serde(default)]
        stdout: Option<String>,
        #[serde(default)]
        stderr: Option<String>,
    },
}

impl Default for TaskOutput {
    fn default() -> Self {
        TaskOutput::Text(String::new())
    }
}

impl TaskOutput {
    pub fn stdout(&self) -> &str {
        match self {
            TaskOutput::Text(text) => text,
            TaskOutput::Streams { stdout, .. } => stdout.as_deref().unwrap_or_default(),
        }
    }
}
