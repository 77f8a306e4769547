// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::job::task::Limits;
use crate::variables::{RawVariable, VariablesTable};

/// A pipeline file as read from TOML.
///
/// ```toml
/// name = "compile-c"
///
/// [[variables]]
/// name = "source-files"
/// type = "file[]"
/// value = "$source-files"
///
/// [[boxes]]
/// name = "sources"
/// type = "files-in"
/// [boxes.input]
/// input = "source-files"
/// [boxes.output]
/// in-data = "sources"
///
/// [[boxes]]
/// name = "gcc"
/// type = "compilation"
/// compiler = "/usr/bin/gcc"
/// args = ["-O2"]
/// [boxes.input]
/// source-files = "sources"
/// [boxes.output]
/// binary-file = "binary"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineFile {
    pub name: String,

    #[serde(default)]
    pub variables: Vec<RawVariable>,

    #[serde(default)]
    pub boxes: Vec<RawBox>,
}

/// `[[boxes]]` entry.
///
/// Kind-specific fields are optional here; which ones a box type needs is
/// checked when the box is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawBox {
    pub name: String,

    #[serde(rename = "type")]
    pub box_type: String,

    /// Runner for execution boxes (`python3`, `java`, ...).
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub compiler: Option<String>,

    #[serde(default)]
    pub judge: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub output_flag: Option<String>,

    /// Input port name -> variable name.
    #[serde(default)]
    pub input: BTreeMap<String, String>,

    /// Output port name -> variable name.
    #[serde(default)]
    pub output: BTreeMap<String, String>,
}

/// An exercise configuration file as read from TOML.
///
/// ```toml
/// [environments.c-gcc]
/// variables = [
///   { name = "source-files", type = "file[]", value = ["*.c"] },
/// ]
///
/// [[tests]]
/// name = "T1"
/// [tests.environments.c-gcc]
/// pipelines = [
///   { name = "compile-c" },
///   { name = "run-judge", variables = [
///       { name = "stdin", type = "remote-file", value = "9f2c...e1" },
///   ] },
/// ]
///
/// [limits.group1.T1]
/// time = 1.5
/// memory = 65536
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawExerciseFile {
    #[serde(default)]
    pub environments: BTreeMap<String, RawEnvironment>,

    #[serde(default)]
    pub tests: Vec<RawTest>,

    /// `limits.<hw-group>.<test>`.
    #[serde(default)]
    pub limits: BTreeMap<String, BTreeMap<String, Limits>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawEnvironment {
    #[serde(default)]
    pub variables: Vec<RawVariable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTest {
    pub name: String,

    #[serde(default)]
    pub environments: BTreeMap<String, RawTestEnvironment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTestEnvironment {
    pub pipelines: Vec<RawPipelineBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineBinding {
    pub name: String,

    #[serde(default)]
    pub variables: Vec<RawVariable>,
}

/// Validated exercise configuration.
///
/// Obtained through `ExerciseConfig::try_from(RawExerciseFile)`; see
/// `config::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseConfig {
    environments: BTreeMap<String, VariablesTable>,
    tests: Vec<TestConfig>,
    limits: BTreeMap<String, BTreeMap<String, Limits>>,
}

impl ExerciseConfig {
    pub(crate) fn new_unchecked(
        environments: BTreeMap<String, VariablesTable>,
        tests: Vec<TestConfig>,
        limits: BTreeMap<String, BTreeMap<String, Limits>>,
    ) -> Self {
        Self {
            environments,
            tests,
            limits,
        }
    }

    /// Variables of a runtime environment.
    pub fn environment(&self, name: &str) -> Option<&VariablesTable> {
        self.environments.get(name)
    }

    pub fn tests(&self) -> &[TestConfig] {
        &self.tests
    }

    pub fn test(&self, name: &str) -> Option<&TestConfig> {
        self.tests.iter().find(|t| t.name == name)
    }

    pub fn test_names(&self) -> Vec<String> {
        self.tests.iter().map(|t| t.name.clone()).collect()
    }

    /// Hardware groups with declared limits, sorted.
    pub fn hw_groups(&self) -> Vec<String> {
        self.limits.keys().cloned().collect()
    }

    pub fn limits_for(&self, hw_group: &str, test: &str) -> Option<&Limits> {
        self.limits.get(hw_group)?.get(test)
    }
}

/// One exercise test and the pipelines it runs per environment.
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    pub name: String,
    pub environments: BTreeMap<String, Vec<PipelineBinding>>,
}

impl TestConfig {
    pub fn pipelines_for(&self, environment: &str) -> Option<&[PipelineBinding]> {
        self.environments.get(environment).map(Vec::as_slice)
    }
}

/// A pipeline used by a test, with the test's values for its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineBinding {
    pub name: String,
    pub variables: VariablesTable,
}
