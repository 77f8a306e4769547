// src/boxes/mod.rs

//! Boxes: the typed compilation units pipelines are made of.
//!
//! - [`ports`] is the constant table of box types and their default ports.
//! - [`compile`] turns one box with bound ports into task drafts.
//!
//! Every box kind is a variant of [`BoxKind`]; compilation matches on it
//! exhaustively, so a new kind cannot be forgotten.

pub mod compile;
pub mod ports;

use std::collections::BTreeMap;

use crate::errors::ConfigError;
use crate::variables::VariableType;

pub use compile::{BoundPorts, BoxOutput, CompilationParams, PortEffect, TaskDraft};
pub use ports::{BoxCategory, BoxTypeSpec, PortSpec, box_type};

/// Default compiler output flag (`cc ... -o <binary>`).
pub const DEFAULT_OUTPUT_FLAG: &str = "-o";

/// Kind-specific settings of an execution box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionSpec {
    /// Interpreter or runner; when absent the bound binary runs directly.
    pub command: Option<String>,
    /// Fixed arguments placed before the binary and the `args` port.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationSpec {
    pub compiler: String,
    pub args: Vec<String>,
    pub output_flag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeSpec {
    pub judge: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxKind {
    DataIn,
    DataOut,
    Execution(ExecutionSpec),
    Compilation(CompilationSpec),
    Judge(JudgeSpec),
    Merge,
    ScalarToArray,
}

/// Kind-specific settings as written in a pipeline file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxParams {
    pub command: Option<String>,
    pub compiler: Option<String>,
    pub judge: Option<String>,
    pub args: Vec<String>,
    pub output_flag: Option<String>,
}

impl BoxKind {
    fn from_params(
        box_name: &str,
        spec: &BoxTypeSpec,
        params: BoxParams,
    ) -> Result<Self, ConfigError> {
        let kind = match spec.category {
            BoxCategory::DataIn => BoxKind::DataIn,
            BoxCategory::DataOut => BoxKind::DataOut,
            BoxCategory::Merge => BoxKind::Merge,
            BoxCategory::ScalarToArray => BoxKind::ScalarToArray,
            BoxCategory::Execution => BoxKind::Execution(ExecutionSpec {
                command: params.command.filter(|c| !c.is_empty()),
                args: params.args,
            }),
            BoxCategory::Compilation => {
                let compiler = params.compiler.filter(|c| !c.is_empty()).ok_or_else(|| {
                    ConfigError::port_mismatch(box_name, "compilation box needs a `compiler`")
                })?;
                BoxKind::Compilation(CompilationSpec {
                    compiler,
                    args: params.args,
                    output_flag: params
                        .output_flag
                        .unwrap_or_else(|| DEFAULT_OUTPUT_FLAG.to_string()),
                })
            }
            BoxCategory::Judge => {
                let judge = params.judge.filter(|j| !j.is_empty()).ok_or_else(|| {
                    ConfigError::port_mismatch(box_name, "judge box needs a `judge` binary")
                })?;
                BoxKind::Judge(JudgeSpec {
                    judge,
                    args: params.args,
                })
            }
        };
        Ok(kind)
    }
}

/// One port of a box instance together with the variable it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: &'static str,
    pub ty: VariableType,
    pub required: bool,
    pub variable: Option<String>,
}

impl Port {
    fn from_spec(spec: &PortSpec, bindings: &mut BTreeMap<String, String>) -> Self {
        Self {
            name: spec.name,
            ty: spec.ty,
            required: spec.required,
            variable: bindings.remove(spec.name).filter(|v| !v.is_empty()),
        }
    }
}

/// A box instance inside a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineBox {
    name: String,
    spec: &'static BoxTypeSpec,
    kind: BoxKind,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

impl PipelineBox {
    /// Create a box of type `tag`, binding ports to variable names.
    ///
    /// Fails on unknown types, unknown ports and unbound required ports.
    pub fn new(
        name: impl Into<String>,
        tag: &str,
        params: BoxParams,
        mut inputs: BTreeMap<String, String>,
        mut outputs: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let spec = box_type(tag).ok_or_else(|| ConfigError::UnknownBoxType(tag.to_string()))?;
        let kind = BoxKind::from_params(&name, spec, params)?;

        let in_ports: Vec<Port> = spec
            .inputs
            .iter()
            .map(|p| Port::from_spec(p, &mut inputs))
            .collect();
        let out_ports: Vec<Port> = spec
            .outputs
            .iter()
            .map(|p| Port::from_spec(p, &mut outputs))
            .collect();

        if let Some(port) = inputs.keys().chain(outputs.keys()).next() {
            return Err(ConfigError::port_mismatch(
                &name,
                format!("box type '{tag}' has no port '{port}'"),
            ));
        }
        if let Some(port) = in_ports
            .iter()
            .chain(out_ports.iter())
            .find(|p| p.required && p.variable.is_none())
        {
            return Err(ConfigError::port_mismatch(
                &name,
                format!("required port '{}' is not bound", port.name),
            ));
        }

        Ok(Self {
            name,
            spec,
            kind,
            inputs: in_ports,
            outputs: out_ports,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &'static str {
        self.spec.tag
    }

    pub fn category(&self) -> BoxCategory {
        self.spec.category
    }

    pub fn kind(&self) -> &BoxKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    pub fn input(&self, port: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == port)
    }

    pub fn output(&self, port: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == port)
    }

    /// Input ports that are bound, with their variable names.
    pub fn bound_inputs(&self) -> impl Iterator<Item = (&Port, &str)> {
        self.inputs
            .iter()
            .filter_map(|p| p.variable.as_deref().map(|v| (p, v)))
    }

    pub fn bound_outputs(&self) -> impl Iterator<Item = (&Port, &str)> {
        self.outputs
            .iter()
            .filter_map(|p| p.variable.as_deref().map(|v| (p, v)))
    }

    /// Variable bound to the first port of a data-in box's output side.
    pub fn data_in_variable(&self) -> Option<&str> {
        match self.kind {
            BoxKind::DataIn => self.outputs.first().and_then(|p| p.variable.as_deref()),
            _ => None,
        }
    }

    /// Variable bound to the input side of a data-out box.
    pub fn data_out_variable(&self) -> Option<&str> {
        match self.kind {
            BoxKind::DataOut => self.inputs.first().and_then(|p| p.variable.as_deref()),
            _ => None,
        }
    }
}
