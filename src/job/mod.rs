// src/job/mod.rs

//! The compiled job: the document handed to the execution worker.
//!
//! - [`task`] is the wire model of one task and its sandbox.
//! - [`paths`] holds the directory placeholders tasks refer to.
//! - [`compiler`] turns an exercise plus pipelines into a [`JobConfig`].

pub mod compiler;
pub mod paths;
pub mod task;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::TaskType;

pub use compiler::{CompilerParams, JobCompiler};
pub use task::{Command, Limits, Sandbox, SandboxLimits, Task};

/// Job header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Submission {
    pub job_id: String,
    #[serde(default)]
    pub hw_groups: Vec<String>,
    /// Ask the worker to keep and return task logs.
    #[serde(default)]
    pub log: bool,
}

/// Complete job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub submission: Submission,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl JobConfig {
    pub fn job_id(&self) -> &str {
        &self.submission.job_id
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// IDs of the tests the job contains, in first-appearance order.
    pub fn test_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for test in self.tasks.iter().filter_map(|t| t.test_id.as_ref()) {
            if !ids.contains(test) {
                ids.push(test.clone());
            }
        }
        ids
    }

    pub fn tasks_of_test<'a>(&'a self, test_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.test_id.as_deref() == Some(test_id))
    }

    pub fn tasks_of_type(&self, task_type: TaskType) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.task_type == task_type)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
