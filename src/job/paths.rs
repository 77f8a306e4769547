// src/job/paths.rs

//! Placeholders the worker substitutes with real directories, and the
//! per-test layout built on top of them.

/// Directory holding the submitted files (and, per test, working copies).
pub const SOURCE_DIR: &str = "${SOURCE_DIR}";
/// Directory whose content is archived and returned with the results.
pub const RESULT_DIR: &str = "${RESULT_DIR}";

/// Working directory of a test, outside any sandbox.
pub fn test_dir(test_id: &str) -> String {
    format!("{SOURCE_DIR}/{test_id}")
}

/// Per-test directory for debug artifacts.
pub fn result_dir(test_id: &str) -> String {
    format!("{RESULT_DIR}/{test_id}")
}

/// Last path component of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
