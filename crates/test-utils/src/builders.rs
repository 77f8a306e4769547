#![allow(dead_code)]

use std::collections::BTreeMap;

use pipejudge::config::model::{
    RawBox, RawEnvironment, RawExerciseFile, RawPipelineBinding, RawTest, RawTestEnvironment,
};
use pipejudge::config::{ExerciseConfig, RawPipelineFile};
use pipejudge::job::Limits;
use pipejudge::pipeline::Pipeline;
use pipejudge::variables::{RawValue, RawVariable};

/// Raw variable with a scalar value (`"$x"` for a reference).
pub fn var(name: &str, ty: &str, value: &str) -> RawVariable {
    RawVariable {
        name: name.to_string(),
        ty: ty.to_string(),
        value: RawValue::Scalar(value.to_string()),
        directory: None,
    }
}

/// Raw variable with a sequence value.
pub fn array_var(name: &str, ty: &str, values: &[&str]) -> RawVariable {
    RawVariable {
        name: name.to_string(),
        ty: ty.to_string(),
        value: RawValue::Array(values.iter().map(|v| v.to_string()).collect()),
        directory: None,
    }
}

/// Builder for `Pipeline` to simplify test setup.
pub struct PipelineBuilder {
    pipeline: RawPipelineFile,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            pipeline: RawPipelineFile {
                name: name.to_string(),
                variables: vec![],
                boxes: vec![],
            },
        }
    }

    pub fn variable(mut self, variable: RawVariable) -> Self {
        self.pipeline.variables.push(variable);
        self
    }

    /// Declare a variable with no value yet.
    pub fn empty(self, name: &str, ty: &str) -> Self {
        self.variable(var(name, ty, ""))
    }

    /// Declare a variable referencing a same-named one from an outer scope.
    pub fn external(self, name: &str, ty: &str) -> Self {
        self.variable(var(name, ty, &format!("${name}")))
    }

    pub fn with_box(mut self, b: BoxBuilder) -> Self {
        self.pipeline.boxes.push(b.build());
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.pipeline
    }

    pub fn build(self) -> Pipeline {
        Pipeline::try_from(self.pipeline).expect("Failed to build valid pipeline from builder")
    }
}

/// Builder for `RawBox`.
pub struct BoxBuilder {
    b: RawBox,
}

impl BoxBuilder {
    pub fn new(name: &str, box_type: &str) -> Self {
        Self {
            b: RawBox {
                name: name.to_string(),
                box_type: box_type.to_string(),
                command: None,
                compiler: None,
                judge: None,
                args: vec![],
                output_flag: None,
                input: BTreeMap::new(),
                output: BTreeMap::new(),
            },
        }
    }

    pub fn input(mut self, port: &str, variable: &str) -> Self {
        self.b.input.insert(port.to_string(), variable.to_string());
        self
    }

    pub fn output(mut self, port: &str, variable: &str) -> Self {
        self.b.output.insert(port.to_string(), variable.to_string());
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.b.command = Some(command.to_string());
        self
    }

    pub fn compiler(mut self, compiler: &str) -> Self {
        self.b.compiler = Some(compiler.to_string());
        self
    }

    pub fn judge(mut self, judge: &str) -> Self {
        self.b.judge = Some(judge.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.b.args.push(arg.to_string());
        self
    }

    pub fn output_flag(mut self, flag: &str) -> Self {
        self.b.output_flag = Some(flag.to_string());
        self
    }

    pub fn build(self) -> RawBox {
        self.b
    }
}

/// Builder for `ExerciseConfig`.
pub struct ExerciseBuilder {
    exercise: RawExerciseFile,
}

impl ExerciseBuilder {
    pub fn new() -> Self {
        Self {
            exercise: RawExerciseFile {
                environments: BTreeMap::new(),
                tests: vec![],
                limits: BTreeMap::new(),
            },
        }
    }

    pub fn environment(mut self, name: &str, variables: Vec<RawVariable>) -> Self {
        self.exercise
            .environments
            .insert(name.to_string(), RawEnvironment { variables });
        self
    }

    /// Add a test running `pipelines` in `environment`. Each pipeline comes
    /// with the test's variables for it.
    pub fn test(
        mut self,
        name: &str,
        environment: &str,
        pipelines: Vec<(&str, Vec<RawVariable>)>,
    ) -> Self {
        let pipelines = pipelines
            .into_iter()
            .map(|(name, variables)| RawPipelineBinding {
                name: name.to_string(),
                variables,
            })
            .collect();
        let mut environments = BTreeMap::new();
        environments.insert(environment.to_string(), RawTestEnvironment { pipelines });
        self.exercise.tests.push(RawTest {
            name: name.to_string(),
            environments,
        });
        self
    }

    pub fn limits(mut self, hw_group: &str, test: &str, limits: Limits) -> Self {
        self.exercise
            .limits
            .entry(hw_group.to_string())
            .or_default()
            .insert(test.to_string(), limits);
        self
    }

    pub fn raw(self) -> RawExerciseFile {
        self.exercise
    }

    pub fn build(self) -> ExerciseConfig {
        ExerciseConfig::try_from(self.exercise).expect("Failed to build valid exercise from builder")
    }
}

impl Default for ExerciseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `compile-c`: copies the submitted C sources in, compiles them and hands
/// the binary on through a `file-out` box bound to `binary`.
pub fn compile_pipeline() -> Pipeline {
    PipelineBuilder::new("compile-c")
        .external("source-files", "file[]")
        .empty("sources", "file[]")
        .empty("binary", "file")
        .with_box(
            BoxBuilder::new("sources", "files-in")
                .input("input", "source-files")
                .output("in-data", "sources"),
        )
        .with_box(
            BoxBuilder::new("gcc", "compilation")
                .compiler("/usr/bin/gcc")
                .arg("-O2")
                .output_flag("-o")
                .input("source-files", "sources")
                .output("binary-file", "binary"),
        )
        .with_box(BoxBuilder::new("out", "file-out").input("out-data", "binary"))
        .build()
}

/// `run-judge`: picks the binary up, runs it on a fetched input and judges
/// its stdout against a fetched expected output.
pub fn run_pipeline() -> Pipeline {
    PipelineBuilder::new("run-judge")
        .empty("binary-src", "file")
        .empty("binary", "file")
        .external("input-src", "remote-file")
        .variable(var("input", "file", "input.txt"))
        .external("expected-src", "remote-file")
        .variable(var("expected", "file", "expected.txt"))
        .empty("actual", "file")
        .with_box(
            BoxBuilder::new("binary-in", "file-in")
                .input("input", "binary-src")
                .output("in-data", "binary"),
        )
        .with_box(
            BoxBuilder::new("input-in", "file-in")
                .input("input", "input-src")
                .output("in-data", "input"),
        )
        .with_box(
            BoxBuilder::new("expected-in", "file-in")
                .input("input", "expected-src")
                .output("in-data", "expected"),
        )
        .with_box(
            BoxBuilder::new("run", "execution")
                .input("binary-file", "binary")
                .input("stdin", "input")
                .output("stdout", "actual"),
        )
        .with_box(
            BoxBuilder::new("judge", "judge")
                .judge("/usr/bin/judge-text")
                .input("expected-output", "expected")
                .input("actual-output", "actual"),
        )
        .build()
}

/// Test variables binding the run pipeline's remote inputs.
pub fn run_bindings(input_hash: &str, expected_hash: &str) -> Vec<RawVariable> {
    vec![
        var("input-src", "remote-file", input_hash),
        var("expected-src", "remote-file", expected_hash),
    ]
}

/// Exercise with tests `T1..=Tn`, each compiling and running once in the
/// `c-gcc` environment, with limits for `group1`.
pub fn c_exercise(tests: usize) -> ExerciseConfig {
    let mut builder = ExerciseBuilder::new().environment(
        "c-gcc",
        vec![array_var("source-files", "file[]", &["*.c"])],
    );
    for n in 1..=tests {
        let name = format!("T{n}");
        builder = builder
            .test(
                &name,
                "c-gcc",
                vec![
                    ("compile-c", vec![]),
                    ("run-judge", run_bindings(&format!("in{n}"), &format!("exp{n}"))),
                ],
            )
            .limits(
                "group1",
                &name,
                Limits {
                    time: 1.0,
                    wall_time: 2.0,
                    memory: 65536,
                    parallel: 1,
                },
            );
    }
    builder.build()
}

/// Both standard pipelines keyed by name.
pub fn c_pipelines() -> BTreeMap<String, Pipeline> {
    [compile_pipeline(), run_pipeline()]
        .into_iter()
        .map(|p| (p.name().to_string(), p))
        .collect()
}
