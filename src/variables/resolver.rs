// src/variables/resolver.rs

//! Reference resolution for pipeline variables.
//!
//! A pipeline variable whose value is `$target` is looked up in a list of
//! scopes, most specific first (the test's per-pipeline bindings, then the
//! environment). Resolved local file values may contain wildcards, which are
//! matched against the names of the submitted files.

use std::collections::HashSet;

use globset::Glob;
use tracing::debug;

use crate::errors::ConfigError;
use crate::variables::{Variable, VariableValue, VariablesTable};

const WILDCARD_CHARS: &[char] = &['*', '?', '[', '{'];

pub struct VariableResolver<'a> {
    scopes: Vec<&'a VariablesTable>,
    submitted_files: &'a [String],
}

impl<'a> VariableResolver<'a> {
    pub fn new(scopes: Vec<&'a VariablesTable>, submitted_files: &'a [String]) -> Self {
        Self {
            scopes,
            submitted_files,
        }
    }

    /// Resolve `variable` to a literal that keeps its name.
    ///
    /// The resolved type is the target's (a `file` port may end up holding a
    /// `remote-file`), provided the two are compatible.
    pub fn resolve(&self, variable: &Variable) -> Result<Variable, ConfigError> {
        let mut current = variable.clone();
        let mut seen: HashSet<(usize, String)> = HashSet::new();
        // A variable referencing its own name continues the search in the
        // next, less specific scope.
        let mut start_scope = 0;

        while let Some(target) = current.reference_target().map(str::to_string) {
            let from = if target == current.name() { start_scope } else { 0 };
            let (scope_idx, found) = self.lookup(&target, from).ok_or_else(|| {
                ConfigError::UnresolvedReference {
                    variable: variable.name().to_string(),
                    reference: target.clone(),
                }
            })?;

            if !seen.insert((scope_idx, target.clone())) {
                return Err(ConfigError::invalid_variable(
                    variable.name(),
                    format!("reference loop through '${target}'"),
                ));
            }
            if !variable.ty().is_compatible_with(found.ty()) {
                return Err(ConfigError::invalid_variable(
                    variable.name(),
                    format!(
                        "expects '{}' but '${target}' is of type '{}'",
                        variable.ty(),
                        found.ty()
                    ),
                ));
            }

            debug!(
                variable = %variable.name(),
                reference = %target,
                scope = scope_idx,
                "resolved reference"
            );
            start_scope = scope_idx + 1;
            current = found.clone();
        }

        let resolved = current.renamed(variable.name());
        self.expand_wildcards(resolved)
    }

    fn lookup(&self, name: &str, from: usize) -> Option<(usize, &'a Variable)> {
        self.scopes
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(idx, scope)| scope.get(name).map(|v| (idx, v)))
    }

    fn expand_wildcards(&self, mut variable: Variable) -> Result<Variable, ConfigError> {
        if !variable.ty().is_file() || variable.ty().is_remote() {
            return Ok(variable);
        }
        let Some(value) = variable.literal() else {
            return Ok(variable);
        };
        let elements = value.elements();
        if !elements.iter().any(|e| e.contains(WILDCARD_CHARS)) {
            return Ok(variable);
        }

        let mut expanded: Vec<String> = Vec::new();
        for pattern in elements {
            if !pattern.contains(WILDCARD_CHARS) {
                expanded.push(pattern.to_string());
                continue;
            }
            let matched = self.match_submitted(variable.name(), pattern)?;
            if matched.is_empty() {
                return Err(ConfigError::UnmatchedWildcard {
                    variable: variable.name().to_string(),
                    pattern: pattern.to_string(),
                    reason: "matched no submitted file".to_string(),
                });
            }
            for name in matched {
                if !expanded.contains(&name) {
                    expanded.push(name);
                }
            }
        }

        if !variable.ty().is_array() && expanded.len() != 1 {
            return Err(ConfigError::UnmatchedWildcard {
                variable: variable.name().to_string(),
                pattern: value_label(variable.literal()),
                reason: format!("expected exactly one file, matched {}", expanded.len()),
            });
        }

        debug!(variable = %variable.name(), files = ?expanded, "expanded wildcards");
        variable.set_value(VariableValue::from_elements(variable.ty(), expanded))?;
        Ok(variable)
    }

    fn match_submitted(&self, variable: &str, pattern: &str) -> Result<Vec<String>, ConfigError> {
        let matcher = Glob::new(pattern)
            .map_err(|e| ConfigError::UnmatchedWildcard {
                variable: variable.to_string(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();
        Ok(self
            .submitted_files
            .iter()
            .filter(|name| matcher.is_match(name.as_str()))
            .cloned()
            .collect())
    }
}

fn value_label(value: Option<&VariableValue>) -> String {
    value.map(|v| v.elements().join(" ")).unwrap_or_default()
}
