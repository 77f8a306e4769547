// src/pipeline/tree.rs

use petgraph::graph::{Graph, NodeIndex};

/// Bucket a box falls into during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Input,
    Output,
    Other,
}

/// One box instance of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNode {
    /// Position of the pipeline in the merge order.
    pub pipeline: usize,
    pub box_index: usize,
    pub role: NodeRole,
}

/// Variable flowing from a producer box to a consumer box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEdge {
    pub variable: String,
    /// Data-out to data-in edge across two pipelines.
    pub joined: bool,
}

pub type PortGraph = Graph<PortNode, PortEdge>;

/// A cross-pipeline join of a data-out box onto a data-in box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub variable: String,
    pub from: NodeIndex,
    pub to: NodeIndex,
}

/// Result of merging the pipelines of one test.
#[derive(Debug, Clone, Default)]
pub struct MergeTree {
    pub graph: PortGraph,
    pub input: Vec<NodeIndex>,
    pub output: Vec<NodeIndex>,
    pub other: Vec<NodeIndex>,
    pub joins: Vec<Join>,
    /// Data-in variables nobody upstream produced; configuration feeds them.
    pub unmatched_inputs: Vec<String>,
    /// Data-out variables nobody downstream consumed.
    pub dangling_outputs: Vec<String>,
}

impl MergeTree {
    /// Node of box `box_index` in pipeline `pipeline`.
    pub fn node(&self, pipeline: usize, box_index: usize) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&i| self.graph[i].pipeline == pipeline && self.graph[i].box_index == box_index)
    }

    /// Upstream data-out node joined onto `node`, if any.
    pub fn joined_from(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.joins.iter().find(|j| j.to == node).map(|j| j.from)
    }

    pub fn is_joined(&self, node: NodeIndex) -> bool {
        self.joins.iter().any(|j| j.to == node || j.from == node)
    }
}
