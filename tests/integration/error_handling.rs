// tests/integration/error_handling.rs

use std::io::Write;

use pipejudge::config::{load_exercise, load_pipeline, load_pipelines};
use pipejudge::errors::{ConfigError, PipejudgeError};
use pipejudge::job::{CompilerParams, JobCompiler};
use pipejudge_test_utils::builders::{
    ExerciseBuilder, array_var, c_exercise, c_pipelines, run_bindings,
};
use tempfile::NamedTempFile;

const COMPILE_PIPELINE: &str = r#"
name = "compile-c"

[[variables]]
name = "source-files"
type = "file[]"
value = "$source-files"

[[variables]]
name = "sources"
type = "file[]"

[[variables]]
name = "binary"
type = "file"

[[boxes]]
name = "sources"
type = "files-in"
[boxes.input]
input = "source-files"
[boxes.output]
in-data = "sources"

[[boxes]]
name = "gcc"
type = "compilation"
compiler = "/usr/bin/gcc"
output-flag = "-o"
[boxes.input]
source-files = "sources"
[boxes.output]
binary-file = "binary"

[[boxes]]
name = "out"
type = "file-out"
[boxes.input]
out-data = "binary"
"#;

const EXERCISE: &str = r#"
[environments.c-gcc]
variables = [{ name = "source-files", type = "file[]", value = ["*.c"] }]

[[tests]]
name = "T1"

[[tests.environments.c-gcc.pipelines]]
name = "compile-c"

[limits.group1.T1]
time = 1.5
wall-time = 3.0
memory = 65536
"#;

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn submitted(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn files_on_disk_compile_into_a_job() {
    let pipeline_file = temp_file(COMPILE_PIPELINE);
    let exercise_file = temp_file(EXERCISE);

    let pipelines = load_pipelines(&[pipeline_file.path()]).unwrap();
    let exercise = load_exercise(exercise_file.path()).unwrap();
    assert_eq!(exercise.limits_for("group1", "T1").unwrap().time, 1.5);

    let params = CompilerParams {
        job_id: "disk".into(),
        environment: "c-gcc".into(),
        submitted_files: submitted(&["a.c"]),
        ..CompilerParams::default()
    };
    let job = JobCompiler::new(&exercise, &pipelines).compile(&params).unwrap();
    // mkdir, one copy, compiler and exists check
    assert_eq!(job.tasks.len(), 4);
}

#[test]
fn duplicate_pipeline_names_are_rejected() {
    let a = temp_file(COMPILE_PIPELINE);
    let b = temp_file(COMPILE_PIPELINE);
    match load_pipelines(&[a.path(), b.path()]) {
        Err(PipejudgeError::Config(ConfigError::Invalid(msg))) => {
            assert!(msg.contains("compile-c"));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = temp_file("name = \n");
    assert!(matches!(
        load_pipeline(file.path()),
        Err(PipejudgeError::Toml(_))
    ));
}

#[test]
fn unknown_fields_are_rejected() {
    let file = temp_file("name = \"p\"\ncolour = \"red\"\n");
    assert!(matches!(
        load_pipeline(file.path()),
        Err(PipejudgeError::Toml(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_exercise("/nonexistent/exercise.toml"),
        Err(PipejudgeError::Io(_))
    ));
}

fn compile_with(
    exercise: &pipejudge::config::ExerciseConfig,
    environment: &str,
    files: &[&str],
) -> Result<pipejudge::job::JobConfig, ConfigError> {
    let pipelines = c_pipelines();
    let params = CompilerParams {
        job_id: "j".into(),
        environment: environment.into(),
        submitted_files: submitted(files),
        ..CompilerParams::default()
    };
    JobCompiler::new(exercise, &pipelines).compile(&params)
}

#[test]
fn unknown_environment_is_reported() {
    let err = compile_with(&c_exercise(1), "java", &["main.c"]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownEnvironment {
            test: String::new(),
            environment: "java".into(),
        }
    );
}

#[test]
fn unknown_pipeline_is_reported() {
    let exercise = ExerciseBuilder::new()
        .environment("c-gcc", vec![])
        .test("T1", "c-gcc", vec![("compile-rust", vec![])])
        .build();
    assert_eq!(
        compile_with(&exercise, "c-gcc", &[]).unwrap_err(),
        ConfigError::UnknownPipeline("compile-rust".into())
    );
}

#[test]
fn wildcard_without_match_fails() {
    let err = compile_with(&c_exercise(1), "c-gcc", &["main.py"]).unwrap_err();
    assert!(
        matches!(&err, ConfigError::UnmatchedWildcard { pattern, .. } if pattern == "*.c"),
        "{err:?}"
    );
}

#[test]
fn unbound_reference_fails() {
    let exercise = ExerciseBuilder::new()
        .environment(
            "c-gcc",
            vec![array_var("source-files", "file[]", &["*.c"])],
        )
        .test(
            "T1",
            "c-gcc",
            vec![("compile-c", vec![]), ("run-judge", vec![])],
        )
        .build();
    let err = compile_with(&exercise, "c-gcc", &["main.c"]).unwrap_err();
    assert!(
        matches!(&err, ConfigError::UnresolvedReference { reference, .. } if reference.ends_with("-src")),
        "{err:?}"
    );
}

#[test]
fn consuming_before_producing_is_a_conflict() {
    let exercise = ExerciseBuilder::new()
        .environment(
            "c-gcc",
            vec![array_var("source-files", "file[]", &["*.c"])],
        )
        .test(
            "T1",
            "c-gcc",
            vec![("run-judge", run_bindings("in", "exp")), ("compile-c", vec![])],
        )
        .build();
    let err = compile_with(&exercise, "c-gcc", &["main.c"]).unwrap_err();
    assert!(
        matches!(&err, ConfigError::VariableConflict { variable, .. } if variable == "binary"),
        "{err:?}"
    );
}
