// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::boxes::{BoxParams, PipelineBox};
use crate::config::model::{
    ExerciseConfig, PipelineBinding, RawBox, RawExerciseFile, RawPipelineFile, TestConfig,
};
use crate::errors::ConfigError;
use crate::pipeline::Pipeline;
use crate::variables::VariablesTable;

static NAME_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$"));

/// Check an identifier used in task IDs and file names.
pub fn validate_name(kind: &str, name: &str) -> Result<(), ConfigError> {
    let re = NAME_RE
        .as_ref()
        .map_err(|e| ConfigError::Invalid(format!("name pattern: {e}")))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{kind} name '{name}' must match [A-Za-z0-9_.-]+"
        )))
    }
}

impl TryFrom<RawPipelineFile> for Pipeline {
    type Error = ConfigError;

    fn try_from(raw: RawPipelineFile) -> Result<Self, Self::Error> {
        validate_name("pipeline", &raw.name)?;
        let variables = VariablesTable::from_raw(raw.variables)?;
        let boxes = raw
            .boxes
            .into_iter()
            .map(build_box)
            .collect::<Result<Vec<_>, _>>()?;

        let pipeline = Pipeline::new(raw.name, boxes, variables)?;
        validate_box_graph(&pipeline)?;
        Ok(pipeline)
    }
}

fn build_box(raw: RawBox) -> Result<PipelineBox, ConfigError> {
    validate_name("box", &raw.name)?;
    let params = BoxParams {
        command: raw.command,
        compiler: raw.compiler,
        judge: raw.judge,
        args: raw.args,
        output_flag: raw.output_flag,
    };
    PipelineBox::new(raw.name, &raw.box_type, params, raw.input, raw.output)
}

/// Reject cycles among the boxes of one pipeline.
fn validate_box_graph(pipeline: &Pipeline) -> Result<(), ConfigError> {
    // Edge direction: producer -> consumer.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for idx in 0..pipeline.boxes().len() {
        graph.add_node(idx);
    }
    for (from, to, _) in pipeline.internal_edges() {
        graph.add_edge(from, to, ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let b = &pipeline.boxes()[cycle.node_id()];
            Err(ConfigError::CyclicDependency(format!(
                "{}.{}",
                pipeline.name(),
                b.name()
            )))
        }
    }
}

impl TryFrom<RawExerciseFile> for ExerciseConfig {
    type Error = ConfigError;

    fn try_from(raw: RawExerciseFile) -> Result<Self, Self::Error> {
        if raw.tests.is_empty() {
            return Err(ConfigError::Invalid(
                "exercise must contain at least one [[tests]] entry".to_string(),
            ));
        }

        let mut environments = BTreeMap::new();
        for (name, env) in raw.environments {
            validate_name("environment", &name)?;
            environments.insert(name, VariablesTable::from_raw(env.variables)?);
        }

        let mut seen = HashSet::new();
        let mut tests = Vec::with_capacity(raw.tests.len());
        for test in raw.tests {
            validate_name("test", &test.name)?;
            if !seen.insert(test.name.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "test '{}' is declared more than once",
                    test.name
                )));
            }

            let mut test_envs = BTreeMap::new();
            for (env_name, env) in test.environments {
                if !environments.contains_key(&env_name) {
                    return Err(ConfigError::UnknownEnvironment {
                        test: test.name.clone(),
                        environment: env_name,
                    });
                }
                if env.pipelines.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "test '{}' uses no pipelines in environment '{env_name}'",
                        test.name
                    )));
                }
                let bindings = env
                    .pipelines
                    .into_iter()
                    .map(|p| {
                        Ok(PipelineBinding {
                            name: p.name,
                            variables: VariablesTable::from_raw(p.variables)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                test_envs.insert(env_name, bindings);
            }

            tests.push(TestConfig {
                name: test.name,
                environments: test_envs,
            });
        }

        for (hw_group, per_test) in &raw.limits {
            validate_name("hardware group", hw_group)?;
            for (test, limits) in per_test {
                if !seen.contains(test) {
                    return Err(ConfigError::Invalid(format!(
                        "limits.{hw_group}.{test} refers to an unknown test"
                    )));
                }
                if !limits.is_valid() {
                    return Err(ConfigError::Invalid(format!(
                        "limits.{hw_group}.{test} must be non-negative"
                    )));
                }
            }
        }

        Ok(ExerciseConfig::new_unchecked(environments, tests, raw.limits))
    }
}
