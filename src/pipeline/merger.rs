// src/pipeline/merger.rs

//! Cross-pipeline merge.
//!
//! Pipelines are processed in the order given. A data-out box of an
//! earlier pipeline is joined onto a data-in box of a later one when both
//! are bound to the same variable name. The earliest producer and the
//! earliest consumer of a name win.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use tracing::{debug, warn};

use crate::boxes::BoxCategory;
use crate::errors::ConfigError;
use crate::pipeline::Pipeline;
use crate::pipeline::tree::{Join, MergeTree, NodeRole, PortEdge, PortNode};

pub fn merge(pipelines: &[&Pipeline]) -> Result<MergeTree, ConfigError> {
    let mut tree = MergeTree::default();
    let mut outputs: Vec<(String, NodeIndex)> = Vec::new();
    let mut inputs: Vec<String> = Vec::new();
    let mut bound: HashSet<String> = HashSet::new();
    let mut references: Vec<(String, String)> = Vec::new();

    for (p_idx, pipeline) in pipelines.iter().enumerate() {
        let nodes = add_pipeline(&mut tree, p_idx, pipeline);

        let local_inputs: Vec<(&str, NodeIndex)> = pipeline
            .boxes()
            .iter()
            .zip(&nodes)
            .filter_map(|(b, &n)| b.data_in_variable().map(|v| (v, n)))
            .collect();
        let local_outputs: Vec<(&str, NodeIndex)> = pipeline
            .boxes()
            .iter()
            .zip(&nodes)
            .filter_map(|(b, &n)| b.data_out_variable().map(|v| (v, n)))
            .collect();

        if let Some((name, _)) = local_inputs
            .iter()
            .find(|(name, _)| local_outputs.iter().any(|(o, _)| o == name))
        {
            return Err(ConfigError::variable_conflict(
                name,
                format!(
                    "pipeline '{}' binds it to both a data-in and a data-out box",
                    pipeline.name()
                ),
            ));
        }

        for &(name, to) in &local_inputs {
            match outputs.iter().position(|(o, _)| o == name) {
                Some(pos) => {
                    let (variable, from) = outputs.remove(pos);
                    debug!(
                        variable = %variable,
                        pipeline = pipeline.name(),
                        "joined data-out onto data-in"
                    );
                    tree.graph.add_edge(
                        from,
                        to,
                        PortEdge {
                            variable: variable.clone(),
                            joined: true,
                        },
                    );
                    tree.joins.push(Join { variable, from, to });
                }
                None => inputs.push(name.to_string()),
            }
            bound.insert(name.to_string());
        }

        for &(name, from) in &local_outputs {
            if outputs.iter().any(|(o, _)| o == name) {
                warn!(
                    variable = name,
                    pipeline = pipeline.name(),
                    "variable already produced by an earlier pipeline; keeping the first"
                );
                tree.dangling_outputs.push(name.to_string());
            } else {
                outputs.push((name.to_string(), from));
            }
            bound.insert(name.to_string());
        }

        for variable in pipeline.variables() {
            if let Some(target) = variable.reference_target() {
                references.push((variable.name().to_string(), target.to_string()));
            }
        }
    }

    if let Some(name) = inputs.iter().find(|i| outputs.iter().any(|(o, _)| o == *i)) {
        return Err(ConfigError::variable_conflict(
            name,
            "consumed by an earlier pipeline than the one producing it",
        ));
    }
    if let Some((variable, target)) = references.iter().find(|(_, t)| bound.contains(t)) {
        return Err(ConfigError::variable_conflict(
            variable,
            format!("references '${target}', which is bound to a data box"),
        ));
    }

    tree.dangling_outputs
        .extend(outputs.into_iter().map(|(name, _)| name));
    for name in &tree.dangling_outputs {
        debug!(variable = %name, "data-out variable has no consumer");
    }
    tree.unmatched_inputs = inputs;
    Ok(tree)
}

fn add_pipeline(tree: &mut MergeTree, p_idx: usize, pipeline: &Pipeline) -> Vec<NodeIndex> {
    let nodes: Vec<NodeIndex> = pipeline
        .boxes()
        .iter()
        .enumerate()
        .map(|(box_index, b)| {
            let role = match b.category() {
                BoxCategory::DataIn => NodeRole::Input,
                BoxCategory::DataOut => NodeRole::Output,
                _ => NodeRole::Other,
            };
            let idx = tree.graph.add_node(PortNode {
                pipeline: p_idx,
                box_index,
                role,
            });
            match role {
                NodeRole::Input => tree.input.push(idx),
                NodeRole::Output => tree.output.push(idx),
                NodeRole::Other => tree.other.push(idx),
            }
            idx
        })
        .collect();

    for (from, to, variable) in pipeline.internal_edges() {
        tree.graph.add_edge(
            nodes[from],
            nodes[to],
            PortEdge {
                variable,
                joined: false,
            },
        );
    }
    nodes
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::boxes::{BoxParams, PipelineBox};
    use crate::variables::{Variable, VariableType, VariablesTable};

    fn bind(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// `file-in(src -> name)`.
    fn producer_in(name: &str) -> Pipeline {
        let b = PipelineBox::new(
            "in",
            "file-in",
            BoxParams::default(),
            bind(&[("input", "src")]),
            bind(&[("in-data", name)]),
        )
        .unwrap();
        let vars = VariablesTable::try_from(vec![
            Variable::reference("src", VariableType::File, "src").unwrap(),
            Variable::empty(name, VariableType::File),
        ])
        .unwrap();
        Pipeline::new(format!("in-{name}"), vec![b], vars).unwrap()
    }

    /// `file-out(name)`, where `name` references `target`.
    fn producer_out(pipeline: &str, name: &str, target: &str) -> Pipeline {
        let b = PipelineBox::new(
            "out",
            "file-out",
            BoxParams::default(),
            bind(&[("out-data", name)]),
            BTreeMap::new(),
        )
        .unwrap();
        let vars = VariablesTable::try_from(vec![Variable::reference(
            name,
            VariableType::File,
            target,
        )
        .unwrap()])
        .unwrap();
        Pipeline::new(pipeline, vec![b], vars).unwrap()
    }

    #[test]
    fn data_out_joins_later_data_in() {
        let p1 = producer_out("p1", "v", "upstream");
        let p2 = producer_in("v");
        let tree = merge(&[&p1, &p2]).unwrap();

        assert_eq!(tree.joins.len(), 1);
        assert!(tree.unmatched_inputs.is_empty());
        assert!(tree.dangling_outputs.is_empty());
        let join = &tree.joins[0];
        assert_eq!(tree.graph[join.from].pipeline, 0);
        assert_eq!(tree.graph[join.to].pipeline, 1);
        assert!(tree.is_joined(join.to));
        assert_eq!(tree.joined_from(join.to), Some(join.from));
    }

    #[test]
    fn unmatched_names_stay_in_their_buckets() {
        let p1 = producer_out("p1", "a", "upstream");
        let p2 = producer_in("b");
        let tree = merge(&[&p1, &p2]).unwrap();
        assert_eq!(tree.unmatched_inputs, vec!["b".to_string()]);
        assert_eq!(tree.dangling_outputs, vec!["a".to_string()]);
        assert_eq!(tree.input.len(), 1);
        assert_eq!(tree.output.len(), 1);
    }

    #[test]
    fn consumer_before_producer_conflicts() {
        let p1 = producer_in("v");
        let p2 = producer_out("p2", "v", "upstream");
        let err = merge(&[&p1, &p2]).unwrap_err();
        assert!(matches!(err, ConfigError::VariableConflict { .. }));
    }

    #[test]
    fn first_producer_wins() {
        let p1 = producer_out("p1", "v", "upstream");
        let p2 = producer_out("p2", "v", "upstream");
        let p3 = producer_in("v");
        let tree = merge(&[&p1, &p2, &p3]).unwrap();
        assert_eq!(tree.graph[tree.joins[0].from].pipeline, 0);
        assert_eq!(tree.dangling_outputs, vec!["v".to_string()]);
    }

    #[test]
    fn reference_onto_data_box_name_conflicts() {
        let p1 = producer_in("x");
        let p2 = producer_out("p2", "w", "x");
        let err = merge(&[&p1, &p2]).unwrap_err();
        assert!(matches!(err, ConfigError::VariableConflict { .. }));
    }
}
