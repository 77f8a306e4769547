// src/job/task.rs

use serde::{Deserialize, Serialize};

use crate::types::TaskType;

/// Name of the execution backend's isolation mechanism.
pub const ISOLATE: &str = "isolate";

/// One unit of work in the compiled job.
///
/// Field names follow the worker's job-configuration format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    pub task_id: String,
    pub priority: u32,
    pub fatal_failure: bool,
    pub cmd: Command,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<Sandbox>,
}

impl Task {
    pub fn is_sandboxed(&self) -> bool {
        self.sandbox.is_some()
    }

    /// Limits this task declares for `hw_group`.
    pub fn limits_for(&self, hw_group: &str) -> Option<&Limits> {
        self.sandbox
            .as_ref()?
            .limits
            .iter()
            .find(|l| l.hw_group_id == hw_group)
            .map(|l| &l.limits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub bin: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Command {
    pub fn new(bin: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            bin: bin.into(),
            args,
        }
    }
}

/// Sandbox settings of a confined task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sandbox {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<SandboxLimits>,
}

impl Sandbox {
    /// `isolate` sandbox rooted in the given working directory.
    pub fn isolate(working_directory: &str) -> Self {
        Self {
            name: ISOLATE.to_string(),
            stdin: None,
            stdout: None,
            stderr: None,
            working_directory: Some(working_directory.to_string()),
            limits: Vec::new(),
        }
    }
}

/// Limits of one sandboxed task under one hardware group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SandboxLimits {
    pub hw_group_id: String,
    #[serde(flatten)]
    pub limits: Limits,
}

/// Resource limits. Zero means "not limited".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Limits {
    /// CPU time in seconds.
    #[serde(default)]
    pub time: f64,
    /// Wall-clock time in seconds.
    #[serde(default)]
    pub wall_time: f64,
    /// Memory in KiB.
    #[serde(default)]
    pub memory: u64,
    /// Maximum number of processes/threads.
    #[serde(default)]
    pub parallel: u32,
}

impl Limits {
    pub fn is_valid(&self) -> bool {
        self.time.is_finite() && self.time >= 0.0 && self.wall_time.is_finite() && self.wall_time >= 0.0
    }
}
