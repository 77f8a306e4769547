// src/results/stats.rs

use serde::{Deserialize, Serialize};

use crate::job::task::Limits;

/// Isolate status for a run killed on its time limit.
pub const STATUS_TIMEOUT: &str = "TO";

/// Resource usage of one sandboxed task, as reported by the worker.
///
/// Times are in seconds, memory in KiB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Stats {
    pub time: f64,
    pub wall_time: f64,
    pub memory: u64,
    pub max_rss: u64,
    pub exitcode: i32,
    pub exitsig: i32,
    pub killed: bool,
    pub status: String,
    pub message: String,
}

/// Stats judged against the limits of one hardware group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatsInterpretation {
    pub time_ok: bool,
    pub wall_time_ok: bool,
    pub memory_ok: bool,
    pub exitcode: i32,
    /// Used / allowed; zero when the resource is not limited.
    pub used_time_ratio: f64,
    pub used_wall_time_ratio: f64,
    pub used_memory_ratio: f64,
    pub message: String,
}

impl StatsInterpretation {
    pub fn new(stats: &Stats, limits: &Limits) -> Self {
        let timed_out = stats.status == STATUS_TIMEOUT;
        Self {
            time_ok: !timed_out && within(stats.time, limits.time),
            wall_time_ok: within(stats.wall_time, limits.wall_time),
            memory_ok: within(stats.memory as f64, limits.memory as f64),
            exitcode: stats.exitcode,
            used_time_ratio: ratio(stats.time, limits.time),
            used_wall_time_ratio: ratio(stats.wall_time, limits.wall_time),
            used_memory_ratio: ratio(stats.memory as f64, limits.memory as f64),
            message: stats.message.clone(),
        }
    }

    pub fn meets_all_criteria(&self) -> bool {
        self.time_ok && self.wall_time_ok && self.memory_ok
    }
}

fn within(used: f64, limit: f64) -> bool {
    limit <= 0.0 || used <= limit
}

fn ratio(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 { 0.0 } else { used / limit }
}
