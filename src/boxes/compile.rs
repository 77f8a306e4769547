// src/boxes/compile.rs

//! Compilation of a single box into task drafts.
//!
//! A box sees its ports already bound to resolved literal variables
//! ([`BoundPorts`]). It returns the tasks it needs ([`TaskDraft`], without
//! IDs or cross-box dependencies) and the values it writes into its output
//! variables ([`PortEffect`]), which the task-graph builder propagates
//! downstream.

use std::collections::BTreeMap;

use tracing::debug;

use crate::boxes::ports::names::*;
use crate::boxes::{BoxKind, CompilationSpec, ExecutionSpec, JudgeSpec, PipelineBox};
use crate::errors::ConfigError;
use crate::job::paths::{self, SOURCE_DIR};
use crate::job::task::{Command, Sandbox};
use crate::types::{TaskType, priority};
use crate::variables::{Variable, VariableValue};

/// Diagnostic reported when a compiler exits cleanly without producing the
/// expected binary.
pub const EXISTS_FAILED_MESSAGE: &str = "The compilation finished, but the expected output file \
was not created. Make sure the solution contains the required entry point.";

/// Ambient parameters of one compilation pass.
#[derive(Debug, Clone, Copy)]
pub struct CompilationParams<'a> {
    pub job_id: &'a str,
    pub test_id: &'a str,
    pub pipeline: &'a str,
    pub debug: bool,
}

/// Ports of one box bound to concrete, resolved variables.
#[derive(Debug, Clone, Default)]
pub struct BoundPorts {
    inputs: BTreeMap<&'static str, Variable>,
    outputs: BTreeMap<&'static str, Variable>,
    /// Set for data boxes whose variable was wired across pipelines.
    pub joined: bool,
}

impl BoundPorts {
    pub fn new(joined: bool) -> Self {
        Self {
            joined,
            ..Default::default()
        }
    }

    pub fn bind_input(&mut self, port: &'static str, variable: Variable) {
        self.inputs.insert(port, variable);
    }

    pub fn bind_output(&mut self, port: &'static str, variable: Variable) {
        self.outputs.insert(port, variable);
    }

    pub fn input(&self, port: &str) -> Option<&Variable> {
        self.inputs.get(port)
    }

    pub fn output(&self, port: &str) -> Option<&Variable> {
        self.outputs.get(port)
    }
}

/// A task before the builder assigns its ID and dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub task_type: TaskType,
    pub priority: u32,
    pub fatal_failure: bool,
    pub cmd: Command,
    pub sandbox: Option<Sandbox>,
    /// Indices of earlier drafts of the same box this one depends on.
    pub local_deps: Vec<usize>,
}

impl TaskDraft {
    fn internal(bin: &str, args: Vec<String>) -> Self {
        Self {
            task_type: TaskType::Inner,
            priority: priority::DEFAULT,
            fatal_failure: false,
            cmd: Command::new(bin, args),
            sandbox: None,
            local_deps: Vec::new(),
        }
    }
}

/// Value written into an output variable during compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct PortEffect {
    pub port: &'static str,
    pub variable: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxOutput {
    pub tasks: Vec<TaskDraft>,
    pub effects: Vec<PortEffect>,
}

impl BoxOutput {
    fn effect(&mut self, port: &'static str, variable: &Variable, value: VariableValue) {
        self.effects.push(PortEffect {
            port,
            variable: variable.name().to_string(),
            value,
        });
    }

    /// Indices of drafts no other draft of this box depends on.
    pub fn sink_indices(&self) -> Vec<usize> {
        (0..self.tasks.len())
            .filter(|i| !self.tasks.iter().any(|t| t.local_deps.contains(i)))
            .collect()
    }
}

impl PipelineBox {
    pub fn compile(
        &self,
        ports: &BoundPorts,
        params: &CompilationParams<'_>,
    ) -> Result<BoxOutput, ConfigError> {
        let output = match self.kind() {
            BoxKind::DataIn => compile_data_in(self, ports, params)?,
            BoxKind::DataOut => compile_data_out(self, ports, params)?,
            BoxKind::Execution(spec) => compile_execution(self, spec, ports, params)?,
            BoxKind::Compilation(spec) => compile_compilation(self, spec, ports, params)?,
            BoxKind::Judge(spec) => compile_judge(self, spec, ports, params)?,
            BoxKind::Merge => compile_merge(self, ports)?,
            BoxKind::ScalarToArray => compile_scalar_to_array(self, ports)?,
        };
        debug!(
            test = params.test_id,
            pipeline = params.pipeline,
            box_name = self.name(),
            tasks = output.tasks.len(),
            effects = output.effects.len(),
            "compiled box"
        );
        Ok(output)
    }
}

fn required_input<'p>(
    b: &PipelineBox,
    ports: &'p BoundPorts,
    port: &str,
) -> Result<&'p Variable, ConfigError> {
    ports
        .input(port)
        .ok_or_else(|| ConfigError::port_mismatch(b.name(), format!("port '{port}' is not bound")))
}

fn required_output<'p>(
    b: &PipelineBox,
    ports: &'p BoundPorts,
    port: &str,
) -> Result<&'p Variable, ConfigError> {
    ports
        .output(port)
        .ok_or_else(|| ConfigError::port_mismatch(b.name(), format!("port '{port}' is not bound")))
}

/// Literal elements as written, without the variable's directory.
fn raw_elements(variable: &Variable) -> Vec<String> {
    variable
        .literal()
        .map(|v| v.elements().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Elements as the sandbox sees them, inside the variable's directory.
fn elements(variable: Option<&Variable>) -> Vec<String> {
    variable
        .filter(|v| !v.is_reference())
        .map(|v| v.value("").elements().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

fn raw_scalar(variable: &Variable) -> Option<&str> {
    variable
        .literal()
        .and_then(VariableValue::as_scalar)
        .filter(|s| !s.is_empty())
}

fn scalar(variable: Option<&Variable>) -> Option<String> {
    variable.and_then(|v| raw_scalar(v).map(|s| v.addressed(s)))
}

fn required_scalar(b: &PipelineBox, ports: &BoundPorts, port: &str) -> Result<String, ConfigError> {
    scalar(Some(required_input(b, ports, port)?))
        .ok_or_else(|| ConfigError::port_mismatch(b.name(), format!("port '{port}' has no value")))
}

/// Deterministic file name for a value the author left unnamed.
pub fn generated_name(params: &CompilationParams<'_>, box_name: &str, suffix: &str) -> String {
    let seed = format!(
        "{}/{}/{}/{}/{}",
        params.job_id, params.test_id, params.pipeline, box_name, suffix
    );
    let hash = blake3::hash(seed.as_bytes());
    let hex = hash.to_hex();
    format!("{}.{suffix}", &hex.as_str()[..12])
}

fn compile_data_in(
    b: &PipelineBox,
    ports: &BoundPorts,
    params: &CompilationParams<'_>,
) -> Result<BoxOutput, ConfigError> {
    let input = required_input(b, ports, INPUT)?;
    let output = required_output(b, ports, IN_DATA)?;
    let mut out = BoxOutput::default();

    // Strings need no transfer; joined files already live in the test dir.
    if ports.joined || !input.ty().is_file() {
        let value = VariableValue::from_elements(output.ty(), elements(Some(input)));
        out.effect(IN_DATA, output, value);
        return Ok(out);
    }

    let sources = raw_elements(input);
    let declared = raw_elements(output);
    if sources.is_empty() && declared.is_empty() {
        return Ok(out);
    }

    let targets: Vec<String> = if declared.is_empty() {
        sources.iter().map(|s| paths::file_name(s).to_string()).collect()
    } else {
        declared.clone()
    };
    if sources.len() != targets.len() {
        return Err(ConfigError::port_mismatch(
            b.name(),
            format!(
                "{} input file(s) but {} local name(s)",
                sources.len(),
                targets.len()
            ),
        ));
    }

    let test_dir = paths::test_dir(params.test_id);
    if input.ty().is_remote() {
        for (remote, target) in sources.iter().zip(&targets) {
            out.tasks.push(TaskDraft::internal(
                "fetch",
                vec![remote.clone(), format!("{test_dir}/{}", output.addressed(target))],
            ));
        }
    } else {
        let source_paths: Vec<String> = input
            .value(&format!("{SOURCE_DIR}/"))
            .elements()
            .into_iter()
            .map(str::to_string)
            .collect();
        for (source, target) in source_paths.iter().zip(&targets) {
            let target_path = format!("{test_dir}/{}", output.addressed(target));
            if *source == target_path {
                debug!(box_name = b.name(), path = %source, "source and target coincide; no copy");
                continue;
            }
            out.tasks
                .push(TaskDraft::internal("cp", vec![source.clone(), target_path]));
        }
    }

    if declared.is_empty() {
        let value = VariableValue::from_elements(output.ty(), targets);
        out.effect(IN_DATA, output, value);
    }
    Ok(out)
}

fn compile_data_out(
    b: &PipelineBox,
    ports: &BoundPorts,
    params: &CompilationParams<'_>,
) -> Result<BoxOutput, ConfigError> {
    let mut out = BoxOutput::default();
    if !params.debug || ports.joined {
        return Ok(out);
    }

    let files = elements(Some(required_input(b, ports, OUT_DATA)?));
    let test_dir = paths::test_dir(params.test_id);
    let result_dir = paths::result_dir(params.test_id);
    for file in files {
        out.tasks.push(TaskDraft::internal(
            "cp",
            vec![
                format!("{test_dir}/{file}"),
                format!("{result_dir}/{}", paths::file_name(&file)),
            ],
        ));
    }
    Ok(out)
}

fn compile_execution(
    b: &PipelineBox,
    spec: &ExecutionSpec,
    ports: &BoundPorts,
    params: &CompilationParams<'_>,
) -> Result<BoxOutput, ConfigError> {
    let binary = scalar(ports.input(BINARY_FILE));
    let bin = match (&spec.command, &binary) {
        (Some(command), _) => command.clone(),
        (None, Some(binary)) => format!("./{binary}"),
        (None, None) => {
            return Err(ConfigError::port_mismatch(
                b.name(),
                "execution box needs a `command` or a bound `binary-file`",
            ));
        }
    };

    let mut args = spec.args.clone();
    if spec.command.is_some() {
        args.extend(binary.iter().cloned());
    }
    args.extend(elements(ports.input(ARGS)));

    let mut out = BoxOutput::default();
    let mut sandbox = Sandbox::isolate(params.test_id);
    sandbox.stdin = scalar(ports.input(STDIN));

    if let Some(stdout) = ports.output(STDOUT) {
        let name = match raw_scalar(stdout) {
            Some(name) => name.to_string(),
            None => {
                let name = generated_name(params, b.name(), "stdout");
                out.effect(STDOUT, stdout, VariableValue::Scalar(name.clone()));
                name
            }
        };
        sandbox.stdout = Some(stdout.addressed(&name));
    }
    if let Some(file) = ports.output(OUTPUT_FILE) {
        if raw_scalar(file).is_none() {
            let name = generated_name(params, b.name(), "out");
            out.effect(OUTPUT_FILE, file, VariableValue::Scalar(name));
        }
    }
    if params.debug {
        sandbox.stderr = Some(format!(
            "{}.{}",
            params.test_id,
            generated_name(params, b.name(), "stderr")
        ));
    }

    out.tasks.push(TaskDraft {
        task_type: TaskType::Execution,
        priority: priority::EXECUTION,
        fatal_failure: false,
        cmd: Command::new(bin, args),
        sandbox: Some(sandbox),
        local_deps: Vec::new(),
    });
    Ok(out)
}

fn compile_compilation(
    b: &PipelineBox,
    spec: &CompilationSpec,
    ports: &BoundPorts,
    params: &CompilationParams<'_>,
) -> Result<BoxOutput, ConfigError> {
    let sources = elements(Some(required_input(b, ports, SOURCE_FILES)?));
    if sources.is_empty() {
        return Err(ConfigError::port_mismatch(b.name(), "no source files to compile"));
    }

    let mut out = BoxOutput::default();
    let binary = match ports.output(BINARY_FILE) {
        Some(var) => Some(match raw_scalar(var) {
            Some(name) => var.addressed(name),
            None => {
                let name = generated_name(params, b.name(), "bin");
                out.effect(BINARY_FILE, var, VariableValue::Scalar(name.clone()));
                var.addressed(&name)
            }
        }),
        None => None,
    };

    let mut args = spec.args.clone();
    args.extend(elements(ports.input(ARGS)));
    args.extend(sources);
    if let Some(binary) = &binary {
        if !spec.output_flag.is_empty() {
            args.push(spec.output_flag.clone());
            args.push(binary.clone());
        }
    }

    out.tasks.push(TaskDraft {
        task_type: TaskType::Initiation,
        priority: priority::INITIATION,
        fatal_failure: true,
        cmd: Command::new(spec.compiler.clone(), args),
        sandbox: Some(Sandbox::isolate(params.test_id)),
        local_deps: Vec::new(),
    });

    if let Some(binary) = binary {
        out.tasks.push(TaskDraft {
            task_type: TaskType::Inner,
            priority: priority::INITIATION,
            fatal_failure: true,
            cmd: Command::new(
                "exists",
                vec![
                    EXISTS_FAILED_MESSAGE.to_string(),
                    format!("{}/{binary}", paths::test_dir(params.test_id)),
                ],
            ),
            sandbox: None,
            local_deps: vec![0],
        });
    }
    Ok(out)
}

fn compile_judge(
    b: &PipelineBox,
    spec: &JudgeSpec,
    ports: &BoundPorts,
    params: &CompilationParams<'_>,
) -> Result<BoxOutput, ConfigError> {
    let expected = required_scalar(b, ports, EXPECTED_OUTPUT)?;
    let actual = required_scalar(b, ports, ACTUAL_OUTPUT)?;

    let mut args = spec.args.clone();
    args.extend(elements(ports.input(ARGS)));
    args.push(expected);
    args.push(actual);

    Ok(BoxOutput {
        tasks: vec![TaskDraft {
            task_type: TaskType::Evaluation,
            priority: priority::EVALUATION,
            fatal_failure: false,
            cmd: Command::new(spec.judge.clone(), args),
            sandbox: Some(Sandbox::isolate(params.test_id)),
            local_deps: Vec::new(),
        }],
        effects: Vec::new(),
    })
}

fn compile_merge(b: &PipelineBox, ports: &BoundPorts) -> Result<BoxOutput, ConfigError> {
    let mut merged = elements(Some(required_input(b, ports, IN1)?));
    merged.extend(elements(Some(required_input(b, ports, IN2)?)));
    let target = required_output(b, ports, OUT)?;

    let mut out = BoxOutput::default();
    out.effect(OUT, target, VariableValue::from_elements(target.ty(), merged));
    Ok(out)
}

fn compile_scalar_to_array(b: &PipelineBox, ports: &BoundPorts) -> Result<BoxOutput, ConfigError> {
    let items = elements(Some(required_input(b, ports, IN)?));
    let target = required_output(b, ports, OUT)?;

    let mut out = BoxOutput::default();
    out.effect(OUT, target, VariableValue::from_elements(target.ty(), items));
    Ok(out)
}
