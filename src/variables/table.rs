// src/variables/table.rs

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::variables::{RawVariable, Variable};

/// Ordered collection of uniquely named variables.
///
/// Iteration follows insertion order; `set` on an existing name replaces the
/// variable in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Variable>", into = "Vec<Variable>")]
pub struct VariablesTable {
    variables: Vec<Variable>,
}

impl VariablesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace a variable.
    pub fn set(&mut self, variable: Variable) {
        match self.get_mut(variable.name()) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let pos = self.variables.iter().position(|v| v.name() == name)?;
        Some(self.variables.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(Variable::name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Build a table from raw variables, rejecting duplicate names.
    pub fn from_raw(raw: Vec<RawVariable>) -> Result<Self, ConfigError> {
        let variables = raw
            .into_iter()
            .map(Variable::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from(variables)
    }
}

impl TryFrom<Vec<Variable>> for VariablesTable {
    type Error = ConfigError;

    fn try_from(variables: Vec<Variable>) -> Result<Self, Self::Error> {
        let mut table = VariablesTable::new();
        for variable in variables {
            if table.contains(variable.name()) {
                return Err(ConfigError::variable_conflict(
                    variable.name(),
                    "declared more than once in the same table",
                ));
            }
            table.variables.push(variable);
        }
        Ok(table)
    }
}

impl From<VariablesTable> for Vec<Variable> {
    fn from(table: VariablesTable) -> Self {
        table.variables
    }
}

impl<'a> IntoIterator for &'a VariablesTable {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}
