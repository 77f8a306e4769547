// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scoring::uniform::UNIFORM_ID;

/// Command-line arguments for `pipejudge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipejudge",
    version,
    about = "Compile exercise pipelines into worker jobs and score their results.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEJUDGE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile an exercise into a job document.
    Compile(CompileArgs),
    /// Interpret worker results and compute the score.
    Evaluate(EvaluateArgs),
    /// Print the default configuration of a score calculator.
    ScoreConfig(ScoreConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    /// Exercise configuration (TOML).
    #[arg(long, value_name = "PATH")]
    pub exercise: PathBuf,

    /// Pipeline definitions (TOML); repeat for each pipeline.
    #[arg(long = "pipeline", value_name = "PATH", required = true)]
    pub pipelines: Vec<PathBuf>,

    /// Runtime environment to compile for.
    #[arg(long, value_name = "NAME")]
    pub environment: String,

    #[arg(long, value_name = "ID")]
    pub job_id: String,

    /// Hardware groups to emit limits for. Defaults to all declared groups.
    #[arg(long = "hw-group", value_name = "NAME")]
    pub hw_groups: Vec<String>,

    /// Names of the files the student submitted.
    #[arg(long = "submitted", value_name = "NAME")]
    pub submitted_files: Vec<String>,

    /// Keep outputs and stderr of executions in the results.
    #[arg(long)]
    pub debug: bool,

    /// Write the job here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Compile and print a per-test summary instead of the job document.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    /// Job document produced by `compile`.
    #[arg(long, value_name = "PATH")]
    pub job: PathBuf,

    /// Results document returned by the worker.
    #[arg(long, value_name = "PATH")]
    pub results: PathBuf,

    #[arg(long, value_name = "ID", default_value = UNIFORM_ID)]
    pub calculator: String,

    /// Calculator configuration (YAML). Defaults to the calculator's
    /// default configuration over the job's tests.
    #[arg(long, value_name = "PATH")]
    pub score_config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreConfigArgs {
    #[arg(long, value_name = "ID")]
    pub calculator: String,

    #[arg(long = "test", value_name = "NAME")]
    pub tests: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
