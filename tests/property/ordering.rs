use std::collections::HashSet;

use pipejudge::dag::{RootedTree, topological_order};
use pipejudge::errors::ConfigError;
use pipejudge::job::{CompilerParams, JobCompiler};
use pipejudge_test_utils::builders::{c_exercise, c_pipelines};
use proptest::prelude::*;

// Strategy to generate a DAG as (node count, edges).
// Acyclic by construction: an edge always goes from a lower to a higher index.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec((0..n, 0..n), 0..n * 2).prop_map(move |pairs| {
            let edges: HashSet<(usize, usize)> = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect();
            (n, edges.into_iter().collect())
        })
    })
}

fn tree(n: usize, edges: &[(usize, usize)]) -> RootedTree {
    let labels: Vec<String> = (0..n).map(|i| format!("box{i}")).collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    RootedTree::from_edges(&labels, edges)
}

proptest! {
    #[test]
    fn parents_precede_children((n, edges) in dag_strategy(12)) {
        let order = topological_order(&tree(n, &edges)).unwrap();
        prop_assert_eq!(order.len(), n);

        let pos = |i: usize| order.iter().position(|idx| idx.index() == i).unwrap();
        for &(from, to) in &edges {
            prop_assert!(pos(from) < pos(to));
        }
    }

    #[test]
    fn back_edge_is_a_cycle(
        (n, edges) in dag_strategy(12),
        len in 1usize..6,
    ) {
        // chain 0 -> 1 -> ... -> len, closed by len -> 0
        let len = len.min(n - 1);
        let mut edges = edges;
        for i in 0..len {
            edges.push((i, i + 1));
        }
        edges.push((len, 0));

        let result = topological_order(&tree(n, &edges));
        prop_assert!(matches!(result, Err(ConfigError::CyclicDependency(_))));
    }

    #[test]
    fn compiled_jobs_respect_dependencies(
        tests in 1usize..4,
        files in 1usize..5,
        debug in any::<bool>(),
    ) {
        let exercise = c_exercise(tests);
        let pipelines = c_pipelines();
        let params = CompilerParams {
            job_id: "prop".into(),
            environment: "c-gcc".into(),
            debug,
            submitted_files: (0..files).map(|i| format!("src{i}.c")).collect(),
            ..CompilerParams::default()
        };
        let job = JobCompiler::new(&exercise, &pipelines).compile(&params).unwrap();

        // mkdir, one copy per file, compiler, exists, two fetches, run, judge
        prop_assert_eq!(job.tasks.len(), tests * (files + 7));

        let mut seen: HashSet<&str> = HashSet::new();
        for task in &job.tasks {
            prop_assert!(seen.insert(task.task_id.as_str()), "duplicate {}", task.task_id);
            for dep in &task.dependencies {
                prop_assert!(seen.contains(dep.as_str()), "{} needs {}", task.task_id, dep);
            }
        }
    }
}
