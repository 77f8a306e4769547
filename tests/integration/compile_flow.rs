// tests/integration/compile_flow.rs

use std::collections::HashSet;

use pipejudge::job::{CompilerParams, JobCompiler, JobConfig, Task};
use pipejudge::types::{TaskType, priority};
use pipejudge_test_utils::builders::{c_exercise, c_pipelines};
use pipejudge_test_utils::init_tracing;

fn params(debug: bool) -> CompilerParams {
    CompilerParams {
        job_id: "job-1".into(),
        environment: "c-gcc".into(),
        hw_groups: vec![],
        debug,
        submitted_files: vec!["main.c".into(), "util.c".into(), "README.md".into()],
    }
}

fn compile(tests: usize, debug: bool) -> JobConfig {
    init_tracing();
    let exercise = c_exercise(tests);
    let pipelines = c_pipelines();
    JobCompiler::new(&exercise, &pipelines)
        .compile(&params(debug))
        .unwrap()
}

fn task<'a>(job: &'a JobConfig, id: &str) -> &'a Task {
    job.task(id)
        .unwrap_or_else(|| panic!("task {id} missing from {:?}", ids(job)))
}

fn ids(job: &JobConfig) -> Vec<&str> {
    job.tasks.iter().map(|t| t.task_id.as_str()).collect()
}

fn deps(task: &Task) -> HashSet<&str> {
    task.dependencies.iter().map(String::as_str).collect()
}

#[test]
fn compiles_one_test_into_the_expected_tasks() {
    let job = compile(1, false);

    assert_eq!(job.job_id(), "job-1");
    assert_eq!(job.submission.hw_groups, vec!["group1".to_string()]);
    assert!(!job.submission.log);
    assert_eq!(job.tasks.len(), 9, "{:?}", ids(&job));
    assert_eq!(job.tasks[0].task_id, "T1.mkdir");

    let cp_main = task(&job, "T1.compile-c.sources.1");
    assert_eq!(cp_main.cmd.bin, "cp");
    assert_eq!(
        cp_main.cmd.args,
        vec!["${SOURCE_DIR}/main.c", "${SOURCE_DIR}/T1/main.c"]
    );
    assert_eq!(cp_main.dependencies, vec!["T1.mkdir"]);
    assert_eq!(cp_main.task_type, TaskType::Inner);
    assert_eq!(
        task(&job, "T1.compile-c.sources.2").cmd.args[0],
        "${SOURCE_DIR}/util.c"
    );

    let gcc = task(&job, "T1.compile-c.gcc.1");
    assert_eq!(gcc.cmd.bin, "/usr/bin/gcc");
    assert_eq!(&gcc.cmd.args[..4], &["-O2", "main.c", "util.c", "-o"]);
    let binary = gcc.cmd.args[4].clone();
    assert!(binary.ends_with(".bin"));
    assert_eq!(gcc.task_type, TaskType::Initiation);
    assert!(gcc.fatal_failure);
    assert_eq!(gcc.priority, priority::INITIATION);
    assert_eq!(
        deps(gcc),
        HashSet::from(["T1.compile-c.sources.1", "T1.compile-c.sources.2"])
    );

    let exists = task(&job, "T1.compile-c.gcc.2");
    assert_eq!(exists.cmd.bin, "exists");
    assert_eq!(exists.cmd.args[1], format!("${{SOURCE_DIR}}/T1/{binary}"));
    assert_eq!(exists.dependencies, vec!["T1.compile-c.gcc.1"]);

    let fetch = task(&job, "T1.run-judge.input-in.1");
    assert_eq!(fetch.cmd.bin, "fetch");
    assert_eq!(fetch.cmd.args, vec!["in1", "${SOURCE_DIR}/T1/input.txt"]);

    let run = task(&job, "T1.run-judge.run.1");
    assert_eq!(run.task_type, TaskType::Execution);
    assert_eq!(run.cmd.bin, format!("./{binary}"));
    assert_eq!(
        deps(run),
        HashSet::from(["T1.compile-c.gcc.2", "T1.run-judge.input-in.1"])
    );
    let sandbox = run.sandbox.as_ref().unwrap();
    assert_eq!(sandbox.stdin.as_deref(), Some("input.txt"));
    assert_eq!(sandbox.working_directory.as_deref(), Some("T1"));
    assert!(sandbox.stderr.is_none());
    let stdout = sandbox.stdout.clone().unwrap();
    assert!(stdout.ends_with(".stdout"));
    let limits = run.limits_for("group1").unwrap();
    assert_eq!(limits.time, 1.0);
    assert_eq!(limits.memory, 65536);

    let judge = task(&job, "T1.run-judge.judge.1");
    assert_eq!(judge.task_type, TaskType::Evaluation);
    assert_eq!(judge.cmd.bin, "/usr/bin/judge-text");
    assert_eq!(judge.cmd.args, vec!["expected.txt".to_string(), stdout]);
    assert_eq!(
        deps(judge),
        HashSet::from(["T1.run-judge.run.1", "T1.run-judge.expected-in.1"])
    );
}

#[test]
fn dependencies_always_precede_their_task() {
    let job = compile(3, true);
    let mut seen: HashSet<&str> = HashSet::new();
    for task in &job.tasks {
        for dep in &task.dependencies {
            assert!(seen.contains(dep.as_str()), "{} before {dep}", task.task_id);
            let dep_task = job.task(dep).unwrap();
            assert_eq!(dep_task.test_id, task.test_id);
        }
        seen.insert(&task.task_id);
    }
    assert_eq!(job.test_ids(), vec!["T1", "T2", "T3"]);
}

#[test]
fn debug_mode_keeps_logs() {
    let job = compile(1, true);
    assert!(job.submission.log);

    let mkdir = task(&job, "T1.mkdir");
    assert_eq!(mkdir.cmd.args, vec!["${SOURCE_DIR}/T1", "${RESULT_DIR}/T1"]);

    let run = task(&job, "T1.run-judge.run.1");
    let stderr = run.sandbox.as_ref().unwrap().stderr.clone().unwrap();
    assert!(stderr.starts_with("T1."));

    // the joined file-out box still produces nothing
    assert!(job.task("T1.compile-c.out.1").is_none());
}

#[test]
fn generated_names_differ_between_tests_and_jobs() {
    let job = compile(2, false);
    let binary = |test: &str| task(&job, &format!("{test}.compile-c.gcc.1")).cmd.args[4].clone();
    assert_ne!(binary("T1"), binary("T2"));

    let again = compile(2, false);
    assert_eq!(again, job);
}

#[test]
fn job_document_survives_yaml() {
    let job = compile(2, true);
    let yaml = job.to_yaml().unwrap();
    assert!(yaml.contains("job-id: job-1"));
    assert!(yaml.contains("fatal-failure: true"));

    let back = JobConfig::from_yaml(&yaml).unwrap();
    assert_eq!(back, job);
}

#[test]
fn explicit_hw_groups_without_limits_leave_tasks_unlimited() {
    init_tracing();
    let exercise = c_exercise(1);
    let pipelines = c_pipelines();
    let mut params = params(false);
    params.hw_groups = vec!["group2".into()];

    let job = JobCompiler::new(&exercise, &pipelines)
        .compile(&params)
        .unwrap();
    assert_eq!(job.submission.hw_groups, vec!["group2".to_string()]);
    let run = task(&job, "T1.run-judge.run.1");
    assert!(run.sandbox.as_ref().unwrap().limits.is_empty());
}
