use std::collections::{BTreeMap, BTreeSet};

use pipejudge::job::JobConfig;
use pipejudge::results::{RawTaskResult, Stats, TaskOutput};
use pipejudge::types::{TaskStatus, TaskType};
use serde_yaml::{Mapping, Value};

/// A fake worker that:
/// - "runs" every task of a job and reports it as OK
/// - lets a test script failures, missing results, stats and judge output
/// - renders the outcome as a raw results document.
pub struct FakeWorker<'a> {
    job: &'a JobConfig,
    hw_group: String,
    failed: BTreeSet<String>,
    missing: BTreeSet<String>,
    stats: BTreeMap<String, Stats>,
    judge_output: BTreeMap<String, String>,
}

impl<'a> FakeWorker<'a> {
    pub fn new(job: &'a JobConfig, hw_group: &str) -> Self {
        Self {
            job,
            hw_group: hw_group.to_string(),
            failed: BTreeSet::new(),
            missing: BTreeSet::new(),
            stats: BTreeMap::new(),
            judge_output: BTreeMap::new(),
        }
    }

    /// Report `task_id` as FAILED.
    pub fn fail(mut self, task_id: &str) -> Self {
        self.failed.insert(task_id.to_string());
        self
    }

    /// Leave `task_id` out of the results.
    pub fn omit(mut self, task_id: &str) -> Self {
        self.missing.insert(task_id.to_string());
        self
    }

    /// Stats reported for `task_id` instead of the defaults.
    pub fn stats(mut self, task_id: &str, stats: Stats) -> Self {
        self.stats.insert(task_id.to_string(), stats);
        self
    }

    /// Stdout of the evaluation task of `test_id`.
    pub fn judge_says(mut self, test_id: &str, stdout: &str) -> Self {
        self.judge_output
            .insert(test_id.to_string(), stdout.to_string());
        self
    }

    /// Stats of a quick, well-behaved run.
    pub fn default_stats() -> Stats {
        Stats {
            time: 0.1,
            wall_time: 0.2,
            memory: 1024,
            max_rss: 1024,
            status: "OK".to_string(),
            ..Stats::default()
        }
    }

    pub fn results(&self) -> Vec<RawTaskResult> {
        self.job
            .tasks
            .iter()
            .filter(|t| !self.missing.contains(&t.task_id))
            .map(|task| {
                let status = if self.failed.contains(&task.task_id) {
                    TaskStatus::Failed
                } else {
                    TaskStatus::Ok
                };
                let stats = match task.task_type {
                    TaskType::Execution => Some(
                        self.stats
                            .get(&task.task_id)
                            .cloned()
                            .unwrap_or_else(Self::default_stats),
                    ),
                    _ => self.stats.get(&task.task_id).cloned(),
                };
                let stdout = match (task.task_type, &task.test_id) {
                    (TaskType::Evaluation, Some(test)) => self
                        .judge_output
                        .get(test)
                        .cloned()
                        .unwrap_or_else(|| "1.0".to_string()),
                    _ => String::new(),
                };
                RawTaskResult {
                    task_id: task.task_id.clone(),
                    status,
                    stats,
                    output: TaskOutput::Streams {
                        stdout: Some(stdout),
                        stderr: None,
                    },
                }
            })
            .collect()
    }

    /// The results document as the worker would upload it.
    pub fn to_yaml(&self) -> String {
        let results: Vec<Value> = self
            .results()
            .iter()
            .map(|r| serde_yaml::to_value(r).expect("task result serializes"))
            .collect();

        let mut doc = Mapping::new();
        doc.insert("job-id".into(), self.job.job_id().into());
        doc.insert("hw-group".into(), self.hw_group.as_str().into());
        doc.insert("results".into(), Value::Sequence(results));
        serde_yaml::to_string(&doc).expect("results document serializes")
    }
}
