// src/variables/mod.rs

//! Typed variables flowing between boxes and pipelines.
//!
//! - [`variable`] defines [`Variable`], its type and the literal/reference
//!   split.
//! - [`table`] holds the per-pipeline (and per-test) [`VariablesTable`].
//! - [`resolver`] follows references across scopes and expands submitted
//!   file wildcards.

pub mod resolver;
pub mod table;
pub mod variable;

pub use resolver::VariableResolver;
pub use table::VariablesTable;
pub use variable::{
    RawValue, RawVariable, Variable, VariableContent, VariableType, VariableValue,
};
