// src/config/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ExerciseConfig, RawExerciseFile, RawPipelineFile};
use crate::errors::{ConfigError, Result};
use crate::pipeline::Pipeline;

/// Parse and validate a pipeline definition from TOML text.
pub fn parse_pipeline(contents: &str) -> Result<Pipeline> {
    let raw: RawPipelineFile = toml::from_str(contents)?;
    Ok(Pipeline::try_from(raw)?)
}

/// Load a pipeline definition from disk and validate it.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let pipeline = parse_pipeline(&contents)?;
    debug!(path = %path.display(), pipeline = pipeline.name(), "loaded pipeline");
    Ok(pipeline)
}

/// Load several pipeline files, keyed by pipeline name.
///
/// Two files declaring the same pipeline name are an error.
pub fn load_pipelines<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<String, Pipeline>> {
    let mut pipelines = BTreeMap::new();
    for path in paths {
        let pipeline = load_pipeline(path)?;
        if pipelines.contains_key(pipeline.name()) {
            return Err(ConfigError::Invalid(format!(
                "pipeline '{}' is defined more than once",
                pipeline.name()
            ))
            .into());
        }
        pipelines.insert(pipeline.name().to_string(), pipeline);
    }
    info!(count = pipelines.len(), "pipelines loaded");
    Ok(pipelines)
}

/// Parse and validate an exercise configuration from TOML text.
pub fn parse_exercise(contents: &str) -> Result<ExerciseConfig> {
    let raw: RawExerciseFile = toml::from_str(contents)?;
    Ok(ExerciseConfig::try_from(raw)?)
}

/// Load an exercise configuration from disk and validate it.
///
/// Validation covers test names, environments referenced by tests and the
/// limits table; pipelines are only looked up when a job is compiled.
pub fn load_exercise(path: impl AsRef<Path>) -> Result<ExerciseConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let exercise = parse_exercise(&contents)?;
    info!(
        path = %path.display(),
        tests = exercise.tests().len(),
        "exercise loaded"
    );
    Ok(exercise)
}
