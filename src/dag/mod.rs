// src/dag/mod.rs

//! Box graph ordering and task generation.
//!
//! - [`graph`] holds the merged box graph as a [`RootedTree`] with memoized
//!   exported task IDs.
//! - [`builder`] orders it, compiles each box and assigns task IDs and
//!   dependencies.

pub mod builder;
pub mod graph;

pub use builder::{BuildContext, TestPipeline, build_test, mkdir_task_id, topological_order};
pub use graph::{Node, RootedTree};
