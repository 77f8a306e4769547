// src/job/compiler.rs

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::model::ExerciseConfig;
use crate::dag::{BuildContext, TestPipeline, build_test};
use crate::errors::ConfigError;
use crate::job::task::SandboxLimits;
use crate::job::{JobConfig, Submission};
use crate::pipeline::Pipeline;
use crate::types::TaskType;

/// Per-job compilation inputs.
#[derive(Debug, Clone, Default)]
pub struct CompilerParams {
    pub job_id: String,
    pub environment: String,
    /// Hardware groups to emit limits for; empty means every group the
    /// exercise declares limits for.
    pub hw_groups: Vec<String>,
    pub debug: bool,
    pub submitted_files: Vec<String>,
}

/// Compiles an exercise for one runtime environment into a job.
pub struct JobCompiler<'a> {
    exercise: &'a ExerciseConfig,
    pipelines: &'a BTreeMap<String, Pipeline>,
}

impl<'a> JobCompiler<'a> {
    pub fn new(exercise: &'a ExerciseConfig, pipelines: &'a BTreeMap<String, Pipeline>) -> Self {
        Self {
            exercise,
            pipelines,
        }
    }

    pub fn compile(&self, params: &CompilerParams) -> Result<JobConfig, ConfigError> {
        let environment = self.exercise.environment(&params.environment).ok_or_else(|| {
            ConfigError::UnknownEnvironment {
                test: String::new(),
                environment: params.environment.clone(),
            }
        })?;
        let hw_groups = if params.hw_groups.is_empty() {
            self.exercise.hw_groups()
        } else {
            params.hw_groups.clone()
        };

        let mut tasks = Vec::new();
        for test in self.exercise.tests() {
            let bindings = test.pipelines_for(&params.environment).ok_or_else(|| {
                ConfigError::UnknownEnvironment {
                    test: test.name.clone(),
                    environment: params.environment.clone(),
                }
            })?;
            let runs = bindings
                .iter()
                .map(|binding| {
                    let pipeline = self
                        .pipelines
                        .get(&binding.name)
                        .ok_or_else(|| ConfigError::UnknownPipeline(binding.name.clone()))?;
                    Ok(TestPipeline {
                        pipeline,
                        bindings: &binding.variables,
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;

            let ctx = BuildContext {
                job_id: &params.job_id,
                test_id: &test.name,
                environment,
                debug: params.debug,
                submitted_files: &params.submitted_files,
            };
            let mut test_tasks = build_test(&runs, &ctx)?;

            for task in test_tasks
                .iter_mut()
                .filter(|t| t.task_type == TaskType::Execution)
            {
                let Some(sandbox) = task.sandbox.as_mut() else {
                    continue;
                };
                for hw_group in &hw_groups {
                    match self.exercise.limits_for(hw_group, &test.name) {
                        Some(limits) => sandbox.limits.push(SandboxLimits {
                            hw_group_id: hw_group.clone(),
                            limits: *limits,
                        }),
                        None => warn!(
                            test = %test.name,
                            hw_group = %hw_group,
                            "no limits declared; the task runs unlimited on this group"
                        ),
                    }
                }
            }
            tasks.extend(test_tasks);
        }

        info!(
            job = %params.job_id,
            environment = %params.environment,
            tests = self.exercise.tests().len(),
            tasks = tasks.len(),
            "job compiled"
        );
        Ok(JobConfig {
            submission: Submission {
                job_id: params.job_id.clone(),
                hw_groups,
                log: params.debug,
            },
            tasks,
        })
    }
}
