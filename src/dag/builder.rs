// src/dag/builder.rs

//! Task-graph builder.
//!
//! Merges the pipelines of one test, orders the box graph topologically and
//! compiles every box in that order, so values written by a box (generated
//! file names, merged arrays) are visible to the boxes after it.

use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use crate::boxes::{BoundPorts, BoxCategory, CompilationParams, PipelineBox};
use crate::dag::graph::RootedTree;
use crate::errors::ConfigError;
use crate::job::paths;
use crate::job::task::{Command, Task};
use crate::pipeline::{self, MergeTree, Pipeline};
use crate::types::{TaskType, priority};
use crate::variables::{Variable, VariableResolver, VariablesTable};

/// One pipeline of a test together with the test's bindings for it.
#[derive(Debug, Clone, Copy)]
pub struct TestPipeline<'a> {
    pub pipeline: &'a Pipeline,
    pub bindings: &'a VariablesTable,
}

/// Ambient inputs of a single test compilation.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub job_id: &'a str,
    pub test_id: &'a str,
    pub environment: &'a VariablesTable,
    pub debug: bool,
    pub submitted_files: &'a [String],
}

/// ID of the per-test directory set-up task.
pub fn mkdir_task_id(test_id: &str) -> String {
    format!("{test_id}.mkdir")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// Topological order of `tree`, parents first.
///
/// Iterative three-colour DFS seeded with the roots, then with every other
/// node so cycles without a root are found too. Reaching a grey node is a
/// cycle.
pub fn topological_order(tree: &RootedTree) -> Result<Vec<NodeIndex>, ConfigError> {
    let mut colour = vec![Colour::White; tree.len()];
    let mut postorder: Vec<NodeIndex> = Vec::with_capacity(tree.len());

    let seeds = tree.roots().into_iter().chain(tree.nodes());
    for seed in seeds {
        if colour[seed.index()] != Colour::White {
            continue;
        }
        let mut stack: Vec<(NodeIndex, bool)> = vec![(seed, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                colour[node.index()] = Colour::Black;
                postorder.push(node);
                continue;
            }
            if colour[node.index()] != Colour::White {
                continue;
            }
            colour[node.index()] = Colour::Grey;
            stack.push((node, true));
            for child in tree.children(node).into_iter().rev() {
                match colour[child.index()] {
                    Colour::Grey => {
                        return Err(ConfigError::CyclicDependency(tree.node(child).label.clone()));
                    }
                    Colour::White => stack.push((child, false)),
                    Colour::Black => {}
                }
            }
        }
    }

    postorder.reverse();
    Ok(postorder)
}

/// Compile all pipelines of one test into tasks.
///
/// The first task is always the test's `mkdir` initiation task; the rest
/// follow the topological order of the boxes.
pub fn build_test(
    runs: &[TestPipeline<'_>],
    ctx: &BuildContext<'_>,
) -> Result<Vec<Task>, ConfigError> {
    let pipelines: Vec<&Pipeline> = runs.iter().map(|r| r.pipeline).collect();
    let merged = pipeline::merge(&pipelines)?;
    let mut tree = RootedTree::from_merge(&merged, &pipelines);
    let order = topological_order(&tree)?;

    let mut tables: Vec<VariablesTable> = runs.iter().map(private_table).collect();
    let mut tasks = vec![mkdir_task(ctx)];

    for idx in order {
        let (p_idx, b_idx) = {
            let node = tree.node(idx);
            (node.pipeline, node.box_index)
        };
        let run = &runs[p_idx];
        let b = &run.pipeline.boxes()[b_idx];

        let ports = bind_ports(runs, &tables, &merged, idx, p_idx, b, ctx)?;
        let params = CompilationParams {
            job_id: ctx.job_id,
            test_id: ctx.test_id,
            pipeline: run.pipeline.name(),
            debug: ctx.debug,
        };
        let output = b.compile(&ports, &params)?;

        for effect in &output.effects {
            let variable = tables[p_idx].get_mut(&effect.variable).ok_or_else(|| {
                ConfigError::port_mismatch(
                    b.name(),
                    format!("port '{}' writes undeclared '{}'", effect.port, effect.variable),
                )
            })?;
            variable.set_value(effect.value.clone())?;
        }

        let prefix = format!("{}.{}.{}", ctx.test_id, run.pipeline.name(), b.name());
        let ids: Vec<String> = (1..=output.tasks.len()).map(|n| format!("{prefix}.{n}")).collect();
        let upstream = tree.parent_ids(idx);

        for (draft, id) in output.tasks.iter().zip(&ids) {
            let dependencies = if !draft.local_deps.is_empty() {
                draft.local_deps.iter().map(|&i| ids[i].clone()).collect()
            } else if !upstream.is_empty() {
                upstream.clone()
            } else {
                vec![mkdir_task_id(ctx.test_id)]
            };
            debug!(task = %id, deps = ?dependencies, "task created");
            tasks.push(Task {
                task_id: id.clone(),
                priority: draft.priority,
                fatal_failure: draft.fatal_failure,
                cmd: draft.cmd.clone(),
                dependencies,
                task_type: draft.task_type,
                test_id: Some(ctx.test_id.to_string()),
                sandbox: draft.sandbox.clone(),
            });
        }

        let sinks = output.sink_indices().into_iter().map(|i| ids[i].clone()).collect();
        tree.set_sinks(idx, sinks);
    }

    info!(
        test = ctx.test_id,
        pipelines = runs.len(),
        boxes = tree.len(),
        tasks = tasks.len(),
        "test compiled"
    );
    Ok(tasks)
}

/// Copy of a pipeline's variables with the test's bindings applied.
fn private_table(run: &TestPipeline<'_>) -> VariablesTable {
    let mut table = run.pipeline.variables().clone();
    for variable in run.bindings {
        if table.contains(variable.name()) {
            table.set(variable.clone());
        }
    }
    table
}

fn resolve_in(
    runs: &[TestPipeline<'_>],
    tables: &[VariablesTable],
    p_idx: usize,
    name: &str,
    b: &PipelineBox,
    ctx: &BuildContext<'_>,
) -> Result<Variable, ConfigError> {
    let variable = tables[p_idx].get(name).ok_or_else(|| {
        ConfigError::port_mismatch(b.name(), format!("variable '{name}' is not declared"))
    })?;
    let resolver = VariableResolver::new(
        vec![runs[p_idx].bindings, ctx.environment],
        ctx.submitted_files,
    );
    resolver.resolve(variable)
}

fn bind_ports(
    runs: &[TestPipeline<'_>],
    tables: &[VariablesTable],
    merged: &MergeTree,
    idx: NodeIndex,
    p_idx: usize,
    b: &PipelineBox,
    ctx: &BuildContext<'_>,
) -> Result<BoundPorts, ConfigError> {
    let joined = merged.is_joined(idx);
    let mut ports = BoundPorts::new(joined);

    for (port, name) in b.bound_inputs() {
        let variable = match merged.joined_from(idx) {
            Some(from) if b.category() == BoxCategory::DataIn => {
                let upstream = &merged.graph[from];
                let up_box = &runs[upstream.pipeline].pipeline.boxes()[upstream.box_index];
                let up_name = up_box.data_out_variable().ok_or_else(|| {
                    ConfigError::port_mismatch(up_box.name(), "joined box is not a data-out box")
                })?;
                resolve_in(runs, tables, upstream.pipeline, up_name, up_box, ctx)?.renamed(name)
            }
            _ => resolve_in(runs, tables, p_idx, name, b, ctx)?,
        };
        if !port.ty.is_compatible_with(variable.ty()) {
            return Err(ConfigError::port_mismatch(
                b.name(),
                format!(
                    "port '{}' of type '{}' received '{name}' of type '{}'",
                    port.name,
                    port.ty,
                    variable.ty()
                ),
            ));
        }
        ports.bind_input(port.name, variable);
    }

    for (port, name) in b.bound_outputs() {
        let variable = resolve_in(runs, tables, p_idx, name, b, ctx)?;
        ports.bind_output(port.name, variable);
    }
    Ok(ports)
}

fn mkdir_task(ctx: &BuildContext<'_>) -> Task {
    let mut args = vec![paths::test_dir(ctx.test_id)];
    if ctx.debug {
        args.push(paths::result_dir(ctx.test_id));
    }
    Task {
        task_id: mkdir_task_id(ctx.test_id),
        priority: priority::INITIATION,
        fatal_failure: true,
        cmd: Command::new("mkdir", args),
        dependencies: Vec::new(),
        task_type: TaskType::Initiation,
        test_id: Some(ctx.test_id.to_string()),
        sandbox: None,
    }
}
