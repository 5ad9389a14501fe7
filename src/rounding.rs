//! Rounding of fractional assignments into dominating sets.
//!
//! * `threshold_rounding` rounds in a single pass: every value above `ROUNDING_THRESHOLD` becomes
//!   `1`, afterwards every node that is not `1` either rounds itself or its largest neighbor to
//!   `1`.
//! * `iterative_rounding` fixes the values above the threshold to `1`, solves the relaxation again
//!   and repeats, before it finishes with `threshold_rounding`.
//!
//! Both always return a dominating set, whatever the quality of the input.

use fxhash::FxHashSet;
use crate::graph::DyUGraph;
use crate::relaxation::{is_integral, RelaxationOracle};

/// Values above this are rounded to `1` right away.
pub const ROUNDING_THRESHOLD: f64 = 0.8;

/// Number of re-solves `iterative_rounding` does at most.
pub const MAX_REFINEMENT_ROUNDS: usize = 5;

fn value_of(values: &[f64], node: usize) -> f64 {
    match values.get(node) {
        Some(x) if x.is_finite() => x.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Rounds `values` in a single pass.
///
/// Returns the size of the rounded set and the set.
pub fn threshold_rounding(graph: &DyUGraph, values: &[f64]) -> (usize, FxHashSet<usize>) {
    let mut rounded = vec![0.0; graph.num_reserved()];
    for node in graph.nodes() {
        let x = value_of(values, node);
        rounded[node] = if x > ROUNDING_THRESHOLD { 1.0 } else { x };
    }
    let nodes: Vec<usize> = graph.nodes().collect();
    for node in nodes {
        if rounded[node] == 1.0 {
            continue
        }
        let mut max_neig: Option<(usize, f64)> = None;
        for neigh in graph.neighbors(node).as_ref().expect("`node` exists") {
            if max_neig.map_or(true, |(_, val)| rounded[*neigh] > val) {
                max_neig = Some((*neigh, rounded[*neigh]));
            }
        }
        match max_neig {
            Some((neigh, val)) if rounded[node] <= val => rounded[neigh] = 1.0,
            _ => rounded[node] = 1.0,
        }
    }
    let ds: FxHashSet<usize> = graph.nodes().filter(|node| rounded[*node] == 1.0).collect();
    (ds.len(), ds)
}

/// Rounds `values` by repeatedly fixing the values above `ROUNDING_THRESHOLD` to `1` and solving
/// the relaxation again, for at most `max_rounds` rounds or until the assignment is integral.
/// `fixed_one` must hold the nodes `values` was already solved with fixed to `1`.
///
/// A failing re-solve ends the refinement early and rounds the last assignment.
/// Returns the size of the rounded set and the set.
pub fn iterative_rounding<O: RelaxationOracle + ?Sized>(
    oracle: &O,
    graph: &DyUGraph,
    values: &[f64],
    fixed_one: &FxHashSet<usize>,
    max_rounds: usize,
) -> (usize, FxHashSet<usize>) {
    let mut current = values.to_vec();
    let mut fixed = fixed_one.clone();
    let no_zeros = FxHashSet::default();
    for round in 0..max_rounds {
        if is_integral(&current) {
            break
        }
        let before = fixed.len();
        fixed.extend(graph.nodes().filter(|node| value_of(&current, *node) > ROUNDING_THRESHOLD));
        if fixed.len() == before {
            break
        }
        match oracle.solve_fixed(graph, &fixed, &no_zeros) {
            Ok(resolved) => current = resolved,
            Err(e) => {
                log::debug!("refinement round {} stopped: {}", round, e);
                break
            }
        }
    }
    threshold_rounding(graph, &current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxation::SimplexOracle;
    use crate::relaxation::tests::FailingOracle;
    use proptest::prelude::*;

    fn cycle() -> DyUGraph {
        DyUGraph::from_edges(4, &[(1, 2), (2, 3), (3, 4), (4, 1)])
    }

    #[test]
    fn symmetric_cycle_test() {
        let graph = cycle();
        let (size, ds) = threshold_rounding(&graph, &[0.0, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(size, 2);
        assert!(graph.is_dominating_set(&ds));
    }

    #[test]
    fn extreme_inputs_test() {
        let graph = DyUGraph::from_edges(7, &[(1, 2), (2, 3), (3, 4), (5, 6)]);
        let (size, ds) = threshold_rounding(&graph, &[1.0; 8]);
        assert_eq!(size, 7);
        assert!(graph.is_dominating_set(&ds));
        let (_, ds) = threshold_rounding(&graph, &[0.0; 8]);
        assert!(graph.is_dominating_set(&ds));
        assert!(ds.contains(&7));
        let (_, ds) = threshold_rounding(&graph, &[]);
        assert!(graph.is_dominating_set(&ds));
    }

    #[test]
    fn neighbor_wins_ties_test() {
        let graph = DyUGraph::from_edges(2, &[(1, 2)]);
        let (size, ds) = threshold_rounding(&graph, &[0.0, 0.5, 0.5]);
        assert_eq!(size, 1);
        assert_eq!(ds, vec![2].into_iter().collect());
    }

    #[test]
    fn iterative_rounding_test() {
        let graph = DyUGraph::from_edges(6, &[(1, 2), (1, 3), (1, 4), (1, 5), (1, 6)]);
        let values = SimplexOracle.solve(&graph).unwrap();
        let (size, ds) = iterative_rounding(&SimplexOracle, &graph, &values, &FxHashSet::default(), MAX_REFINEMENT_ROUNDS);
        assert_eq!(size, 1);
        assert_eq!(ds, vec![1].into_iter().collect());

        let graph = cycle();
        let values = SimplexOracle.solve(&graph).unwrap();
        let (_, ds) = iterative_rounding(&SimplexOracle, &graph, &values, &FxHashSet::default(), MAX_REFINEMENT_ROUNDS);
        assert!(graph.is_dominating_set(&ds));
    }

    #[test]
    fn iterative_rounding_failing_oracle_test() {
        let graph = cycle();
        let values = vec![0.0, 0.9, 0.3, 0.3, 0.3];
        let (_, ds) = iterative_rounding(&FailingOracle, &graph, &values, &FxHashSet::default(), MAX_REFINEMENT_ROUNDS);
        assert!(graph.is_dominating_set(&ds));
        assert!(ds.contains(&1));
    }

    proptest! {
        #[test]
        fn threshold_rounding_dominates(
            edges in proptest::collection::vec((1usize..=15, 1usize..=15), 0..45),
            values in proptest::collection::vec(0.0f64..1.0, 16),
        ) {
            let graph = DyUGraph::from_edges(15, &edges);
            let (size, ds) = threshold_rounding(&graph, &values);
            prop_assert_eq!(size, ds.len());
            prop_assert!(graph.is_dominating_set(&ds));
        }
    }

}
