// tests/integration/evaluation_flow.rs

use std::ffi::OsStr;
use std::fs;

use clap::Parser;

use pipejudge::cli::CliArgs;
use pipejudge::errors::ResultsLoadingError;
use pipejudge::job::{CompilerParams, JobCompiler, JobConfig};
use pipejudge::results::{EvaluationResults, Stats};
use pipejudge::scoring::{TestScores, calculator_for};
use pipejudge::types::TaskStatus;
use pipejudge_test_utils::builders::{c_exercise, c_pipelines};
use pipejudge_test_utils::fake_worker::FakeWorker;
use pipejudge_test_utils::init_tracing;

fn job(tests: usize) -> JobConfig {
    init_tracing();
    let exercise = c_exercise(tests);
    let pipelines = c_pipelines();
    let params = CompilerParams {
        job_id: "job-1".into(),
        environment: "c-gcc".into(),
        submitted_files: vec!["main.c".into()],
        ..CompilerParams::default()
    };
    JobCompiler::new(&exercise, &pipelines)
        .compile(&params)
        .unwrap()
}

fn scores(results: &EvaluationResults<'_>) -> TestScores {
    results.test_scores().unwrap()
}

#[test]
fn all_calculators_agree_on_default_configs() {
    let job = job(2);
    let raw = FakeWorker::new(&job, "group1").judge_says("T2", "0.5").to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();
    assert!(results.init_ok());
    assert_eq!(results.hw_group(), "group1");

    let scores = scores(&results);
    assert_eq!(scores["T1"], 1.0);
    assert_eq!(scores["T2"], 0.5);

    let names = job.test_ids();
    for id in ["uniform", "weighted", "universal"] {
        let calculator = calculator_for(id).unwrap();
        let config = calculator.default_config(&names);
        calculator.validate_test_names(&config, &names).unwrap();
        let score = calculator.compute_score(&config, &scores).unwrap();
        assert!((score - 0.75).abs() < 1e-9, "{id}: {score}");
    }
}

#[test]
fn weighted_configuration_shifts_the_score() {
    let job = job(2);
    let raw = FakeWorker::new(&job, "group1").judge_says("T2", "0.5").to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();

    let calculator = calculator_for("weighted").unwrap();
    let score = calculator
        .compute_score("test-weights:\n  T1: 200\n  T2: 800\n", &scores(&results))
        .unwrap();
    assert!((score - 0.6).abs() < 1e-9);
}

#[test]
fn exceeded_time_limit_fails_the_test() {
    let job = job(2);
    let slow = Stats {
        time: 1.5,
        status: "TO".into(),
        ..FakeWorker::default_stats()
    };
    let raw = FakeWorker::new(&job, "group1")
        .stats("T2.run-judge.run.1", slow)
        .to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();

    let t1 = results.test_result("T1").unwrap();
    assert!(t1.is_ok());
    assert_eq!(t1.score, 1.0);
    assert!((t1.used_time_ratio - 0.1).abs() < 1e-9);

    let t2 = results.test_result("T2").unwrap();
    assert_eq!(t2.status, TaskStatus::Failed);
    assert_eq!(t2.score, 0.0);
    assert!(t2.limits_exceeded);
    assert!((t2.used_time_ratio - 1.5).abs() < 1e-9);
    assert_eq!(t2.executions.len(), 1);
    assert!(!t2.executions[0].stats.as_ref().unwrap().time_ok);
}

#[test]
fn failed_compilation_fails_the_test() {
    let job = job(1);
    let raw = FakeWorker::new(&job, "group1")
        .fail("T1.compile-c.gcc.1")
        .omit("T1.compile-c.gcc.2")
        .omit("T1.run-judge.run.1")
        .omit("T1.run-judge.judge.1")
        .to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();
    assert!(!results.init_ok());
    assert_eq!(
        results.task_result("T1.run-judge.run.1").unwrap().status,
        TaskStatus::Skipped
    );

    let t1 = results.test_result("T1").unwrap();
    assert_eq!(t1.status, TaskStatus::Failed);
    assert_eq!(t1.score, 0.0);
}

#[test]
fn judge_saying_zero_fails_the_test() {
    let job = job(1);
    let raw = FakeWorker::new(&job, "group1").judge_says("T1", "0 wrong answer").to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();
    let t1 = results.test_result("T1").unwrap();
    assert_eq!(t1.status, TaskStatus::Failed);
    assert!(!t1.limits_exceeded);
}

#[test]
fn results_of_another_job_are_rejected() {
    let job = job(1);
    let raw = FakeWorker::new(&job, "group1")
        .to_yaml()
        .replace("job-id: job-1", "job-id: job-2");
    assert!(matches!(
        EvaluationResults::new(&raw, &job),
        Err(ResultsLoadingError::JobMismatch { .. })
    ));
}

#[test]
fn unknown_hw_group_has_no_limits() {
    let job = job(1);
    let raw = FakeWorker::new(&job, "group9").to_yaml();
    let results = EvaluationResults::new(&raw, &job).unwrap();
    assert!(matches!(
        results.test_result("T1"),
        Err(ResultsLoadingError::MissingLimits { .. })
    ));
}

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
input = { input = "source-files" }
output = { in-data = "sources" }

[[boxes]]
name = "gcc"
type = "compilation"
compiler = "/usr/bin/gcc"
input = { source-files = "sources" }
output = { binary-file = "binary" }

[[boxes]]
name = "out"
type = "file-out"
input = { out-data = "binary" }
"#;

const RUN_PIPELINE: &str = r#"
name = "run-judge"

variables = [
  { name = "binary-src", type = "file" },
  { name = "binary", type = "file" },
  { name = "input-src", type = "remote-file", value = "$input-src" },
  { name = "input", type = "file", value = "input.txt" },
  { name = "expected-src", type = "remote-file", value = "$expected-src" },
  { name = "expected", type = "file", value = "expected.txt" },
  { name = "actual", type = "file" },
]

[[boxes]]
name = "binary-in"
type = "file-in"
input = { input = "binary-src" }
output = { in-data = "binary" }

[[boxes]]
name = "input-in"
type = "file-in"
input = { input = "input-src" }
output = { in-data = "input" }

[[boxes]]
name = "expected-in"
type = "file-in"
input = { input = "expected-src" }
output = { in-data = "expected" }

[[boxes]]
name = "run"
type = "execution"
input = { binary-file = "binary", stdin = "input" }
output = { stdout = "actual" }

[[boxes]]
name = "judge"
type = "judge"
judge = "/usr/bin/judge-text"
input = { expected-output = "expected", actual-output = "actual" }
"#;

const EXERCISE: &str = r#"
[environments.c-gcc]
variables = [{ name = "source-files", type = "file[]", value = ["*.c"] }]

[[tests]]
name = "T1"

[[tests.environments.c-gcc.pipelines]]
name = "compile-c"

[[tests.environments.c-gcc.pipelines]]
name = "run-judge"
variables = [
  { name = "input-src", type = "remote-file", value = "in1" },
  { name = "expected-src", type = "remote-file", value = "exp1" },
]

[limits.group1.T1]
time = 1.0
memory = 65536
"#;

#[test]
fn cli_compiles_and_evaluates_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    fs::write(path("compile.toml"), COMPILE_PIPELINE).unwrap();
    fs::write(path("run.toml"), RUN_PIPELINE).unwrap();
    fs::write(path("exercise.toml"), EXERCISE).unwrap();

    let compile = CliArgs::try_parse_from([
        "pipejudge".to_string(),
        "compile".into(),
        "--exercise".into(),
        path("exercise.toml"),
        "--pipeline".into(),
        path("compile.toml"),
        "--pipeline".into(),
        path("run.toml"),
        "--environment".into(),
        "c-gcc".into(),
        "--job-id".into(),
        "cli-job".into(),
        "--submitted".into(),
        "main.c".into(),
        "--output".into(),
        path("job.yml"),
    ])
    .unwrap();
    pipejudge::run(compile).unwrap();

    let job = JobConfig::from_yaml(&fs::read_to_string(path("job.yml")).unwrap()).unwrap();
    assert_eq!(job.job_id(), "cli-job");
    assert_eq!(job.tasks.len(), 8);

    let raw = FakeWorker::new(&job, "group1").judge_says("T1", "0.25").to_yaml();
    fs::write(path("results.yml"), raw).unwrap();
    fs::write(path("score.yml"), "type: test-result\ntest: T1\n").unwrap();

    let evaluate = CliArgs::try_parse_from([
        "pipejudge".to_string(),
        "evaluate".into(),
        "--job".into(),
        path("job.yml"),
        "--results".into(),
        path("results.yml"),
        "--calculator".into(),
        "universal".into(),
        "--score-config".into(),
        path("score.yml"),
    ])
    .unwrap();
    pipejudge::run(evaluate).unwrap();
}

#[test]
fn cli_rejects_score_config_naming_unknown_tests() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(1);
    let job_path = dir.path().join("job.yml");
    let results_path = dir.path().join("results.yml");
    let config_path = dir.path().join("score.yml");
    fs::write(&job_path, job.to_yaml().unwrap()).unwrap();
    fs::write(&results_path, FakeWorker::new(&job, "group1").to_yaml()).unwrap();
    fs::write(&config_path, "test-weights:\n  T7: 100\n").unwrap();

    let evaluate = CliArgs::try_parse_from([
        OsStr::new("pipejudge"),
        OsStr::new("evaluate"),
        OsStr::new("--job"),
        job_path.as_os_str(),
        OsStr::new("--results"),
        results_path.as_os_str(),
        OsStr::new("--calculator"),
        OsStr::new("weighted"),
        OsStr::new("--score-config"),
        config_path.as_os_str(),
    ])
    .unwrap();
    let err = pipejudge::run(evaluate).unwrap_err();
    assert!(err.to_string().contains("T7"), "{err}");
}
