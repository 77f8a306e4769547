// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a compiled task, as understood by the execution worker.
///
/// - `Initiation`: preparation work (compilation, directory setup); a failed
///   initiation task means the submission could not be prepared.
/// - `Execution`: a sandboxed run of the learner's program under limits.
/// - `Evaluation`: a judge comparing produced output with the expected one.
/// - `Inner`: unconfined bookkeeping (copy, fetch, exists checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Initiation,
    Execution,
    Evaluation,
    Inner,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Initiation => "initiation",
            TaskType::Execution => "execution",
            TaskType::Evaluation => "evaluation",
            TaskType::Inner => "inner",
        };
        f.write_str(s)
    }
}

/// Outcome of a single task (or a whole test) as reported by the worker.
///
/// Ordering is by severity: `Ok < Skipped < Failed`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TaskStatus {
    #[serde(rename = "OK")]
    Ok,
    #[default]
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "FAILED")]
    Failed,
}

impl TaskStatus {
    /// Combine two statuses, keeping the more severe one.
    pub fn worst(self, other: TaskStatus) -> TaskStatus {
        self.max(other)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Ok => "OK",
            TaskStatus::Skipped => "SKIPPED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Per-category scheduling hints for the worker. Advisory only; task
/// `dependencies` are the ordering guarantee.
pub mod priority {
    pub const INITIATION: u32 = 1;
    pub const DEFAULT: u32 = 2;
    pub const EXECUTION: u32 = 3;
    pub const EVALUATION: u32 = 4;
}
