// src/lib.rs

pub mod boxes;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod results;
pub mod scoring;
pub mod types;
pub mod variables;

use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, CompileArgs, EvaluateArgs, ScoreConfigArgs};
use crate::config::{load_exercise, load_pipelines};
use crate::job::{CompilerParams, JobCompiler, JobConfig};
use crate::results::{EvaluationResults, TestResult};
use crate::scoring::{TestScores, calculator_for};
use crate::types::TaskType;

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Compile(compile) => run_compile(&compile),
        Command::Evaluate(evaluate) => run_evaluate(&evaluate),
        Command::ScoreConfig(score_config) => run_score_config(&score_config),
    }
}

fn run_compile(args: &CompileArgs) -> Result<()> {
    let exercise = load_exercise(&args.exercise)
        .with_context(|| format!("loading exercise {}", args.exercise.display()))?;
    let pipelines = load_pipelines(&args.pipelines)?;

    let params = CompilerParams {
        job_id: args.job_id.clone(),
        environment: args.environment.clone(),
        hw_groups: args.hw_groups.clone(),
        debug: args.debug,
        submitted_files: args.submitted_files.clone(),
    };
    let job = JobCompiler::new(&exercise, &pipelines).compile(&params)?;

    if args.dry_run {
        print_dry_run(&job);
        return Ok(());
    }

    let yaml = job.to_yaml()?;
    match &args.output {
        Some(path) => {
            fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "job written");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

/// Document printed by `evaluate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct EvaluationReport {
    job_id: String,
    hw_group: String,
    calculator: String,
    score: f64,
    tests: Vec<TestResult>,
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let job_yaml = fs::read_to_string(&args.job)
        .with_context(|| format!("reading job {}", args.job.display()))?;
    let job = JobConfig::from_yaml(&job_yaml)?;
    let raw = fs::read_to_string(&args.results)
        .with_context(|| format!("reading results {}", args.results.display()))?;
    let results = EvaluationResults::new(&raw, &job)?;

    let tests = results.test_results()?;
    let scores: TestScores = tests
        .iter()
        .map(|t| (t.test_id.clone(), t.score))
        .collect();

    let calculator = calculator_for(&args.calculator)?;
    let test_names = job.test_ids();
    let config = match &args.score_config {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading score config {}", path.display()))?,
        None => calculator.default_config(&test_names),
    };
    calculator.validate_test_names(&config, &test_names)?;
    let score = calculator.compute_score(&config, &scores)?;
    info!(job = %job.job_id(), score, "job evaluated");

    let report = EvaluationReport {
        job_id: results.job_id().to_string(),
        hw_group: results.hw_group().to_string(),
        calculator: calculator.id().to_string(),
        score,
        tests,
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}

fn run_score_config(args: &ScoreConfigArgs) -> Result<()> {
    let calculator = calculator_for(&args.calculator)?;
    print!("{}", calculator.default_config(&args.tests));
    Ok(())
}

/// Per-test summary of a compiled job.
fn print_dry_run(job: &JobConfig) {
    println!("pipejudge dry-run");
    println!("  job-id = {}", job.job_id());
    println!("  hw-groups = {:?}", job.submission.hw_groups);
    println!("  tasks = {}", job.tasks.len());
    println!();

    let test_ids = job.test_ids();
    println!("tests ({}):", test_ids.len());
    for test in &test_ids {
        let tasks: Vec<_> = job.tasks_of_test(test).collect();
        let count = |ty: TaskType| tasks.iter().filter(|t| t.task_type == ty).count();
        println!("  - {test}");
        println!(
            "      initiation: {}, execution: {}, evaluation: {}, inner: {}",
            count(TaskType::Initiation),
            count(TaskType::Execution),
            count(TaskType::Evaluation),
            count(TaskType::Inner)
        );
        for task in &tasks {
            println!("      {} -> {} {}", task.task_id, task.cmd.bin, task.cmd.args.join(" "));
        }
    }

    debug!("dry-run complete (no job written)");
}
