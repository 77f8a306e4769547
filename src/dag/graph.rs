// src/dag/graph.rs

use std::cell::OnceCell;

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};

use crate::pipeline::{MergeTree, Pipeline};

/// Node of the merged box graph once ports no longer matter.
#[derive(Debug, Clone)]
pub struct Node {
    pub pipeline: usize,
    pub box_index: usize,
    /// `pipeline.box`, for diagnostics.
    pub label: String,
    /// IDs of the tasks this node's box ends with (no local dependents).
    sinks: Vec<String>,
    exported: OnceCell<Vec<String>>,
}

/// Arena graph of box nodes with plain parent/child edges.
///
/// Roots are nodes without parents. Acyclicity is not assumed here; the
/// builder checks it before compiling anything.
#[derive(Debug, Clone)]
pub struct RootedTree {
    graph: Graph<Node, ()>,
}

impl RootedTree {
    /// Forget port labels of a merge result.
    pub fn from_merge(tree: &MergeTree, pipelines: &[&Pipeline]) -> Self {
        let graph = tree.graph.map(
            |_, n| Node {
                pipeline: n.pipeline,
                box_index: n.box_index,
                label: format!(
                    "{}.{}",
                    pipelines[n.pipeline].name(),
                    pipelines[n.pipeline].boxes()[n.box_index].name()
                ),
                sinks: Vec::new(),
                exported: OnceCell::new(),
            },
            |_, _| (),
        );
        Self { graph }
    }

    /// Build a bare tree from labels and `(parent, child)` index pairs.
    pub fn from_edges(labels: &[&str], edges: &[(usize, usize)]) -> Self {
        let mut graph = Graph::new();
        let nodes: Vec<NodeIndex> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                graph.add_node(Node {
                    pipeline: 0,
                    box_index: i,
                    label: label.to_string(),
                        sinks: Vec::new(),
                    exported: OnceCell::new(),
                })
            })
            .collect();
        for &(from, to) in edges {
            graph.add_edge(nodes[from], nodes[to], ());
        }
        Self { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    /// Nodes without parents, in insertion order.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.parents(n).next().is_none())
            .collect()
    }

    /// Parents in edge insertion order.
    pub fn parents(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors(idx, Direction::Incoming).into_iter()
    }

    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Outgoing)
    }

    fn neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = Vec::new();
        // petgraph walks adjacency lists newest first
        for n in self.graph.neighbors_directed(idx, dir) {
            if !out.contains(&n) {
                out.push(n);
            }
        }
        out.reverse();
        out
    }

    /// Record the sink tasks compiled for `idx`.
    pub fn set_sinks(&mut self, idx: NodeIndex, sinks: Vec<String>) {
        let node = &mut self.graph[idx];
        node.sinks = sinks;
        node.exported = OnceCell::new();
    }

    /// Task IDs a child of `idx` has to wait for.
    ///
    /// The node's own sink tasks, or, when it compiled into nothing, the
    /// de-duplicated union of its parents' exported IDs. Memoized per node.
    pub fn exported_ids(&self, idx: NodeIndex) -> &[String] {
        self.graph[idx].exported.get_or_init(|| {
            let node = &self.graph[idx];
            if !node.sinks.is_empty() {
                return node.sinks.clone();
            }
            let mut ids: Vec<String> = Vec::new();
            for parent in self.parents(idx) {
                for id in self.exported_ids(parent) {
                    if !ids.contains(id) {
                        ids.push(id.clone());
                    }
                }
            }
            ids
        })
    }

    /// Union of the exported IDs of all direct parents of `idx`.
    pub fn parent_ids(&self, idx: NodeIndex) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for parent in self.parents(idx) {
            for id in self.exported_ids(parent) {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_nodes_export_their_parents() {
        // a -> b -> c, b compiles into nothing
        let mut tree = RootedTree::from_edges(&["a", "b", "c"], &[(0, 1), (1, 2)]);
        let ids: Vec<NodeIndex> = tree.nodes().collect();
        tree.set_sinks(ids[0], vec!["a.1".into()]);

        assert_eq!(tree.parent_ids(ids[2]), vec!["a.1".to_string()]);
        assert_eq!(tree.exported_ids(ids[1]), ["a.1".to_string()]);
    }

    #[test]
    fn exported_ids_are_deduplicated() {
        // a -> b, a -> c, b -> d, c -> d; b and c empty
        let mut tree = RootedTree::from_edges(
            &["a", "b", "c", "d"],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        );
        let ids: Vec<NodeIndex> = tree.nodes().collect();
        tree.set_sinks(ids[0], vec!["a.2".into()]);
        assert_eq!(tree.parent_ids(ids[3]), vec!["a.2".to_string()]);
    }

    #[test]
    fn roots_have_no_parents() {
        let tree = RootedTree::from_edges(&["a", "b", "c"], &[(0, 2), (1, 2)]);
        let roots: Vec<usize> = tree.roots().into_iter().map(|n| n.index()).collect();
        assert_eq!(roots, vec![0, 1]);
        let parents: Vec<usize> = tree.parents(NodeIndex::new(2)).map(|n| n.index()).collect();
        assert_eq!(parents, vec![0, 1]);
    }
}
