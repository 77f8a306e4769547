// src/results/test_result.rs

use serde::Serialize;

use crate::results::stats::StatsInterpretation;
use crate::types::TaskStatus;

/// Outcome of one execution task of a test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionOutcome {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsInterpretation>,
}

/// Judgement of one exercise test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult {
    pub test_id: String,
    pub status: TaskStatus,
    /// Evaluation score in [0,1]; zero whenever the test failed.
    pub score: f64,
    pub limits_exceeded: bool,
    pub used_time_ratio: f64,
    pub used_wall_time_ratio: f64,
    pub used_memory_ratio: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<ExecutionOutcome>,
}

impl TestResult {
    pub fn is_ok(&self) -> bool {
        self.status == TaskStatus::Ok
    }
}
