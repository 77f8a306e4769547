// src/config/mod.rs

//! Configuration loading and validation for pipejudge.
//!
//! Responsibilities:
//! - Define the TOML-backed data model for pipelines and exercises
//!   (`model.rs`).
//! - Load definitions from disk (`loader.rs`).
//! - Turn raw models into validated ones (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_exercise, load_pipeline, load_pipelines, parse_exercise, parse_pipeline};
pub use model::{ExerciseConfig, PipelineBinding, RawExerciseFile, RawPipelineFile, TestConfig};
pub use validate::validate_name;
