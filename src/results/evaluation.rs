// src/results/evaluation.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::errors::ResultsLoadingError;
use crate::job::JobConfig;
use crate::job::task::{Limits, Task};
use crate::results::raw::{RawResultsDocument, RawTaskResult, TaskOutput};
use crate::results::stats::{Stats, StatsInterpretation};
use crate::results::test_result::{ExecutionOutcome, TestResult};
use crate::types::{TaskStatus, TaskType};

/// Outcome of one task; tasks absent from the results are `SKIPPED`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub stats: Option<Stats>,
    pub output: TaskOutput,
}

impl TaskResult {
    fn skipped(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: TaskStatus::Skipped,
            stats: None,
            output: TaskOutput::default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TaskStatus::Ok
    }

    /// Score reported by a judge task.
    ///
    /// The first token of stdout, clamped to [0,1]. A successful judge that
    /// prints no number scores 1; an unsuccessful one scores 0.
    pub fn evaluation_score(&self) -> f64 {
        if !self.is_ok() {
            return 0.0;
        }
        match self
            .output
            .stdout()
            .split_whitespace()
            .next()
            .and_then(|t| t.parse::<f64>().ok())
        {
            Some(score) if score.is_nan() => 0.0,
            Some(score) => score.clamp(0.0, 1.0),
            None => 1.0,
        }
    }
}

impl From<RawTaskResult> for TaskResult {
    fn from(raw: RawTaskResult) -> Self {
        Self {
            task_id: raw.task_id,
            status: raw.status,
            stats: raw.stats,
            output: raw.output,
        }
    }
}

/// Raw results of one job, interpreted against the job configuration.
#[derive(Debug, Clone)]
pub struct EvaluationResults<'a> {
    job: &'a JobConfig,
    hw_group: String,
    results: HashMap<String, TaskResult>,
}

impl<'a> EvaluationResults<'a> {
    /// Parse a results document and check it belongs to `job`.
    pub fn new(raw: &str, job: &'a JobConfig) -> Result<Self, ResultsLoadingError> {
        let doc: RawResultsDocument = serde_yaml::from_str(raw)?;

        let job_id = doc
            .job_id
            .ok_or_else(|| ResultsLoadingError::Malformed("missing 'job-id'".to_string()))?;
        let hw_group = doc
            .hw_group
            .ok_or_else(|| ResultsLoadingError::Malformed("missing 'hw-group'".to_string()))?;
        let entries = match doc.results {
            Some(serde_yaml::Value::Sequence(entries)) => entries,
            Some(_) => {
                return Err(ResultsLoadingError::Malformed(
                    "'results' must be a sequence".to_string(),
                ));
            }
            None => {
                return Err(ResultsLoadingError::Malformed("missing 'results'".to_string()));
            }
        };

        if job_id != job.job_id() {
            return Err(ResultsLoadingError::JobMismatch {
                expected: job.job_id().to_string(),
                found: job_id,
            });
        }

        let mut results = HashMap::new();
        for (idx, entry) in entries.into_iter().enumerate() {
            let raw: RawTaskResult = serde_yaml::from_value(entry).map_err(|e| {
                ResultsLoadingError::Malformed(format!("results[{idx}]: {e}"))
            })?;
            if job.task(&raw.task_id).is_none() {
                warn!(task = %raw.task_id, "result for a task the job does not contain");
                continue;
            }
            results.insert(raw.task_id.clone(), TaskResult::from(raw));
        }
        for task in &job.tasks {
            if !results.contains_key(&task.task_id) {
                debug!(task = %task.task_id, "no result reported; treating as skipped");
                results.insert(task.task_id.clone(), TaskResult::skipped(&task.task_id));
            }
        }

        Ok(Self {
            job,
            hw_group,
            results,
        })
    }

    pub fn job_id(&self) -> &str {
        self.job.job_id()
    }

    pub fn hw_group(&self) -> &str {
        &self.hw_group
    }

    pub fn task_result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// False when any initiation task did not succeed.
    pub fn init_ok(&self) -> bool {
        self.job
            .tasks_of_type(TaskType::Initiation)
            .all(|t| self.status_of(t) == TaskStatus::Ok)
    }

    fn status_of(&self, task: &Task) -> TaskStatus {
        self.results
            .get(&task.task_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    fn limits_of(&self, task: &Task) -> Result<Limits, ResultsLoadingError> {
        match task.limits_for(&self.hw_group) {
            Some(limits) => Ok(*limits),
            None if task.sandbox.as_ref().is_some_and(|s| !s.limits.is_empty()) => {
                Err(ResultsLoadingError::MissingLimits {
                    task: task.task_id.clone(),
                    hw_group: self.hw_group.clone(),
                })
            }
            None => Ok(Limits::default()),
        }
    }

    /// Judgement of one test.
    pub fn test_result(&self, test_id: &str) -> Result<TestResult, ResultsLoadingError> {
        let tasks: Vec<&Task> = self.job.tasks_of_test(test_id).collect();
        if tasks.is_empty() {
            return Err(ResultsLoadingError::UnknownTest(test_id.to_string()));
        }

        let evaluations: Vec<&Task> = tasks
            .iter()
            .copied()
            .filter(|t| t.task_type == TaskType::Evaluation)
            .collect();
        let [evaluation] = evaluations.as_slice() else {
            return Err(ResultsLoadingError::MalformedTest {
                test: test_id.to_string(),
                reason: format!("expected one evaluation task, found {}", evaluations.len()),
            });
        };

        let mut status = TaskStatus::Ok;
        let mut executions = Vec::new();
        for task in tasks.iter().filter(|t| t.task_type != TaskType::Inner) {
            status = status.worst(self.status_of(task));
            if task.task_type != TaskType::Execution {
                continue;
            }
            let limits = self.limits_of(task)?;
            let stats = self
                .results
                .get(&task.task_id)
                .and_then(|r| r.stats.as_ref())
                .map(|s| StatsInterpretation::new(s, &limits));
            executions.push(ExecutionOutcome {
                task_id: task.task_id.clone(),
                status: self.status_of(task),
                stats,
            });
        }

        let limits_exceeded = executions
            .iter()
            .filter_map(|e| e.stats.as_ref())
            .any(|s| !s.meets_all_criteria());
        let eval_score = self
            .results
            .get(&evaluation.task_id)
            .map(TaskResult::evaluation_score)
            .unwrap_or(0.0);

        if limits_exceeded || eval_score == 0.0 {
            status = TaskStatus::Failed;
        }
        let score = if status == TaskStatus::Failed {
            0.0
        } else {
            eval_score
        };

        let max_ratio = |f: fn(&StatsInterpretation) -> f64| {
            executions
                .iter()
                .filter_map(|e| e.stats.as_ref())
                .map(f)
                .fold(0.0, f64::max)
        };
        let result = TestResult {
            test_id: test_id.to_string(),
            status,
            score,
            limits_exceeded,
            used_time_ratio: max_ratio(|s| s.used_time_ratio),
            used_wall_time_ratio: max_ratio(|s| s.used_wall_time_ratio),
            used_memory_ratio: max_ratio(|s| s.used_memory_ratio),
            executions,
        };
        debug!(
            test = test_id,
            status = %result.status,
            score = result.score,
            "test interpreted"
        );
        Ok(result)
    }

    /// Results of every test in the job, in job order.
    pub fn test_results(&self) -> Result<Vec<TestResult>, ResultsLoadingError> {
        self.job
            .test_ids()
            .iter()
            .map(|test| self.test_result(test))
            .collect()
    }

    /// Test name -> score map, the input of score calculators.
    pub fn test_scores(&self) -> Result<BTreeMap<String, f64>, ResultsLoadingError> {
        Ok(self
            .test_results()?
            .into_iter()
            .map(|r| (r.test_id, r.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::task::{Command, Sandbox, SandboxLimits};
    use crate::job::Submission;
    use crate::types::priority;

    fn task(id: &str, task_type: TaskType, sandbox: Option<Sandbox>) -> Task {
        Task {
            task_id: id.into(),
            priority: priority::DEFAULT,
            fatal_failure: false,
            cmd: Command::new("true", vec![]),
            dependencies: vec![],
            task_type,
            test_id: Some("A".into()),
            sandbox,
        }
    }

    fn job() -> JobConfig {
        let mut sandbox = Sandbox::isolate("A");
        sandbox.limits.push(SandboxLimits {
            hw_group_id: "group1".into(),
            limits: Limits {
                time: 1.0,
                wall_time: 2.0,
                memory: 1000,
                parallel: 1,
            },
        });
        JobConfig {
            submission: Submission {
                job_id: "job1".into(),
                hw_groups: vec!["group1".into()],
                log: false,
            },
            tasks: vec![
                task("A.mkdir", TaskType::Initiation, None),
                task("A.run.exec.1", TaskType::Execution, Some(sandbox)),
                task("A.run.judge.1", TaskType::Evaluation, Some(Sandbox::isolate("A"))),
            ],
        }
    }

    const ALL_OK: &str = r#"
job-id: job1
hw-group: group1
results:
  - task-id: A.mkdir
    status: OK
  - task-id: A.run.exec.1
    status: OK
    stats: { time: 0.5, wall-time: 0.6, memory: 400, exitcode: 0, status: OK }
  - task-id: A.run.judge.1
    status: OK
    output: "0.75\n"
"#;

    #[test]
    fn all_ok_within_limits_takes_the_judge_score() {
        let job = job();
        let results = EvaluationResults::new(ALL_OK, &job).unwrap();
        assert!(results.init_ok());
        let test = results.test_result("A").unwrap();
        assert_eq!(test.status, TaskStatus::Ok);
        assert_eq!(test.score, 0.75);
        assert!(!test.limits_exceeded);
        assert_eq!(test.used_time_ratio, 0.5);
    }

    #[test]
    fn limit_breach_fails_the_test() {
        let job = job();
        let raw = ALL_OK.replace("time: 0.5", "time: 1.5");
        let results = EvaluationResults::new(&raw, &job).unwrap();
        let test = results.test_result("A").unwrap();
        assert_eq!(test.status, TaskStatus::Failed);
        assert_eq!(test.score, 0.0);
        assert!(test.limits_exceeded);
    }

    #[test]
    fn missing_results_are_skipped() {
        let job = job();
        let raw = "job-id: job1\nhw-group: group1\nresults: []\n";
        let results = EvaluationResults::new(raw, &job).unwrap();
        assert!(!results.init_ok());
        assert_eq!(
            results.task_result("A.run.exec.1").map(|r| r.status),
            Some(TaskStatus::Skipped)
        );
        let test = results.test_result("A").unwrap();
        assert_eq!(test.status, TaskStatus::Failed);
        assert_eq!(test.score, 0.0);
    }

    #[test]
    fn job_id_must_match() {
        let job = job();
        let raw = ALL_OK.replace("job-id: job1", "job-id: other");
        assert!(matches!(
            EvaluationResults::new(&raw, &job),
            Err(ResultsLoadingError::JobMismatch { .. })
        ));
    }

    #[test]
    fn structural_problems_are_malformed() {
        let job = job();
        for raw in [
            "hw-group: g\nresults: []\n",
            "job-id: job1\nresults: []\n",
            "job-id: job1\nhw-group: g\nresults: 3\n",
            "job-id: job1\nhw-group: g\nresults:\n  - status: OK\n",
        ] {
            assert!(
                matches!(EvaluationResults::new(raw, &job), Err(ResultsLoadingError::Malformed(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn unknown_hw_group_is_missing_limits() {
        let job = job();
        let raw = ALL_OK.replace("hw-group: group1", "hw-group: group2");
        let results = EvaluationResults::new(&raw, &job).unwrap();
        assert!(matches!(
            results.test_result("A"),
            Err(ResultsLoadingError::MissingLimits { .. })
        ));
    }

    #[test]
    fn judge_output_forms() {
        let mut result = TaskResult::skipped("j");
        assert_eq!(result.evaluation_score(), 0.0);

        result.status = TaskStatus::Ok;
        assert_eq!(result.evaluation_score(), 1.0);

        result.output = TaskOutput::Streams {
            stdout: Some("1.7 extra".into()),
            stderr: None,
        };
        assert_eq!(result.evaluation_score(), 1.0);

        result.output = TaskOutput::Text("-3".into());
        assert_eq!(result.evaluation_score(), 0.0);
    }

    #[test]
    fn unknown_test_is_reported() {
        let job = job();
        let results = EvaluationResults::new(ALL_OK, &job).unwrap();
        assert!(matches!(
            results.test_result("Z"),
            Err(ResultsLoadingError::UnknownTest(_))
        ));
    }
}
