// src/pipeline/mod.rs

//! Pipelines and their cross-pipeline merge.
//!
//! - [`Pipeline`] is a validated set of boxes sharing one variables table.
//! - [`tree`] holds the port-level graph types (`PortNode`, `PortEdge`).
//! - [`merger`] wires the pipelines of one test together into a
//!   [`MergeTree`].

pub mod merger;
pub mod tree;

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::boxes::{BoxCategory, PipelineBox};
use crate::errors::ConfigError;
use crate::variables::VariablesTable;

pub use merger::merge;
pub use tree::{Join, MergeTree, NodeRole, PortEdge, PortGraph, PortNode};

/// A named, reusable fragment of an exercise: boxes plus the variables
/// their ports are bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    name: String,
    boxes: Vec<PipelineBox>,
    variables: VariablesTable,
}

impl Pipeline {
    /// Assemble and check a pipeline.
    ///
    /// Every bound variable must be declared with a type compatible with
    /// its port; each variable has at most one producer; a produced variable
    /// cannot also be a reference; each required input is produced inside
    /// the pipeline, supplied by a reference, or holds a literal.
    pub fn new(
        name: impl Into<String>,
        boxes: Vec<PipelineBox>,
        variables: VariablesTable,
    ) -> Result<Self, ConfigError> {
        let pipeline = Self {
            name: name.into(),
            boxes,
            variables,
        };
        pipeline.check_box_names()?;
        pipeline.check_bindings()?;
        let producers = pipeline.check_producers()?;
        pipeline.check_inputs_fed(&producers)?;
        debug!(
            pipeline = %pipeline.name,
            boxes = pipeline.boxes.len(),
            variables = pipeline.variables.len(),
            "pipeline validated"
        );
        Ok(pipeline)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boxes(&self) -> &[PipelineBox] {
        &self.boxes
    }

    pub fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    pub fn box_index(&self, name: &str) -> Option<usize> {
        self.boxes.iter().position(|b| b.name() == name)
    }

    /// Index of the box whose output port is bound to `variable`.
    pub fn producer_of(&self, variable: &str) -> Option<usize> {
        self.boxes
            .iter()
            .position(|b| b.bound_outputs().any(|(_, v)| v == variable))
    }

    /// Indices of boxes reading `variable` on an input port.
    pub fn consumers_of<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.boxes
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.bound_inputs().any(|(_, v)| v == variable))
            .map(|(i, _)| i)
    }

    /// Edges `(producer, consumer)` between boxes of this pipeline.
    pub fn internal_edges(&self) -> Vec<(usize, usize, String)> {
        let mut edges = Vec::new();
        for (from, b) in self.boxes.iter().enumerate() {
            for (_, variable) in b.bound_outputs() {
                for to in self.consumers_of(variable) {
                    edges.push((from, to, variable.to_string()));
                }
            }
        }
        edges
    }

    fn check_box_names(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for b in &self.boxes {
            if !seen.insert(b.name()) {
                return Err(ConfigError::Invalid(format!(
                    "pipeline '{}' declares box '{}' more than once",
                    self.name,
                    b.name()
                )));
            }
        }
        Ok(())
    }

    fn check_bindings(&self) -> Result<(), ConfigError> {
        for b in &self.boxes {
            for (port, variable) in b.bound_inputs().chain(b.bound_outputs()) {
                let declared = self.variables.get(variable).ok_or_else(|| {
                    ConfigError::port_mismatch(
                        b.name(),
                        format!("port '{}' is bound to undeclared variable '{variable}'", port.name),
                    )
                })?;
                if !port.ty.is_compatible_with(declared.ty()) {
                    return Err(ConfigError::port_mismatch(
                        b.name(),
                        format!(
                            "port '{}' of type '{}' cannot hold '{variable}' of type '{}'",
                            port.name,
                            port.ty,
                            declared.ty()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_producers(&self) -> Result<BTreeMap<&str, usize>, ConfigError> {
        let mut producers: BTreeMap<&str, usize> = BTreeMap::new();
        let mut data_out: HashSet<&str> = HashSet::new();

        for (idx, b) in self.boxes.iter().enumerate() {
            for (_, variable) in b.bound_outputs() {
                if let Some(prev) = producers.insert(variable, idx) {
                    return Err(ConfigError::variable_conflict(
                        variable,
                        format!(
                            "produced by both '{}' and '{}'",
                            self.boxes[prev].name(),
                            b.name()
                        ),
                    ));
                }
                if self.variables.get(variable).is_some_and(|v| v.is_reference()) {
                    return Err(ConfigError::variable_conflict(
                        variable,
                        format!("produced by '{}' but declared as a reference", b.name()),
                    ));
                }
            }
            if let Some(variable) = b.data_out_variable() {
                if !data_out.insert(variable) {
                    return Err(ConfigError::variable_conflict(
                        variable,
                        "bound to more than one data-out box",
                    ));
                }
            }
        }
        Ok(producers)
    }

    fn check_inputs_fed(&self, producers: &BTreeMap<&str, usize>) -> Result<(), ConfigError> {
        for b in &self.boxes {
            // Data-in inputs may be fed by another pipeline during the merge.
            if b.category() == BoxCategory::DataIn {
                continue;
            }
            for (port, variable) in b.bound_inputs().filter(|(p, _)| p.required) {
                if producers.contains_key(variable) {
                    continue;
                }
                let fed = self
                    .variables
                    .get(variable)
                    .is_some_and(|v| v.is_reference() || !v.is_empty());
                if !fed {
                    return Err(ConfigError::port_mismatch(
                        b.name(),
                        format!(
                            "required port '{}' reads '{variable}', which nothing provides",
                            port.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
