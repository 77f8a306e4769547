// src/results/mod.rs

//! Interpretation of the worker's raw results.
//!
//! - [`raw`] mirrors the results document.
//! - [`stats`] judges resource usage against limits.
//! - [`evaluation`] ties results to the job and reduces them per test.
//! - [`test_result`] is the per-test outcome handed to score calculators.

pub mod evaluation;
pub mod raw;
pub mod stats;
pub mod test_result;

pub use evaluation::{EvaluationResults, TaskResult};
pub use raw::{RawResultsDocument, RawTaskResult, TaskOutput};
pub use stats::{Stats, StatsInterpretation};
pub use test_result::{ExecutionOutcome, TestResult};
