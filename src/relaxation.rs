//! The fractional relaxation of the dominating set problem:
//!
//! minimize `sum x_v` subject to `x_v + sum_{u in N(v)} x_u >= 1` for every node `v` and
//! `0 <= x_v <= 1`.
//!
//! The solver itself sits behind `RelaxationOracle`. `SimplexOracle` is the default
//! implementation and hands the program to `minilp`.

use fxhash::FxHashSet;
use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use crate::cust_error::ProcessingError;
use crate::graph::DyUGraph;

/// Values are treated as integral if they are this close to `0` or `1`.
pub const INTEGRALITY_EPS: f64 = 1e-6;

/// One value in `[0,1]` per slot of the graph it was computed for. Slot `0` and deleted nodes hold
/// `0`. Must not outlive a change of the graph.
pub type FractionalAssignment = Vec<f64>;

pub trait RelaxationOracle {

    /// Solves the relaxation of `graph` where every node in `fixed_one` is forced to `1` and
    /// every node in `fixed_zero` is forced to `0`. Ids that are not nodes of `graph` are
    /// ignored.
    ///
    /// Returns an optimal assignment, or `ProcessingError::RelaxationInfeasible` if none exists.
    fn solve_fixed(
        &self,
        graph: &DyUGraph,
        fixed_one: &FxHashSet<usize>,
        fixed_zero: &FxHashSet<usize>,
    ) -> Result<FractionalAssignment, ProcessingError>;

    /// Solves the relaxation of `graph` without fixed values.
    fn solve(&self, graph: &DyUGraph) -> Result<FractionalAssignment, ProcessingError> {
        self.solve_fixed(graph, &FxHashSet::default(), &FxHashSet::default())
    }
}

/// Solves the relaxation with the simplex implementation of `minilp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexOracle;

impl RelaxationOracle for SimplexOracle {

    fn solve_fixed(
        &self,
        graph: &DyUGraph,
        fixed_one: &FxHashSet<usize>,
        fixed_zero: &FxHashSet<usize>,
    ) -> Result<FractionalAssignment, ProcessingError> {
        if fixed_one.iter().any(|node| fixed_zero.contains(node) && graph.has_node(*node)) {
            return Err(ProcessingError::RelaxationInfeasible)
        }
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let mut vars = vec![None; graph.num_reserved()];
        for node in graph.nodes() {
            let bounds = if fixed_one.contains(&node) {
                (1.0, 1.0)
            } else if fixed_zero.contains(&node) {
                (0.0, 0.0)
            } else {
                (0.0, 1.0)
            };
            vars[node] = Some(problem.add_var(1.0, bounds));
        }
        for node in graph.nodes() {
            let mut expr = LinearExpr::empty();
            expr.add(vars[node].expect("every node has a variable"), 1.0);
            for neigh in graph.neighbors(node).as_ref().expect("`node` exists") {
                expr.add(vars[*neigh].expect("every node has a variable"), 1.0);
            }
            problem.add_constraint(expr, ComparisonOp::Ge, 1.0);
        }
        let solution = problem.solve().map_err(|e| {
            log::debug!("relaxation failed: {:?}", e);
            ProcessingError::RelaxationInfeasible
        })?;
        let mut values = vec![0.0; graph.num_reserved()];
        for (node, var) in vars.iter().enumerate() {
            if let Some(var) = var {
                values[node] = snap(solution[*var]);
            }
        }
        Ok(values)
    }
}

/// Clamps `value` into `[0,1]` and snaps it to `0` or `1` if it is within `INTEGRALITY_EPS`.
fn snap(value: f64) -> f64 {
    if value < INTEGRALITY_EPS {
        0.0
    } else if value > 1.0 - INTEGRALITY_EPS {
        1.0
    } else {
        value
    }
}

/// Returns the objective value of `values`.
pub fn objective(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Checks if every value is `0` or `1`.
pub fn is_integral(values: &[f64]) -> bool {
    values.iter().all(|x| *x < INTEGRALITY_EPS || *x > 1.0 - INTEGRALITY_EPS)
}

/// Returns the nodes with value `1`.
pub fn ones(values: &[f64]) -> FxHashSet<usize> {
    values.iter()
        .enumerate()
        .filter(|(_, x)| **x > 1.0 - INTEGRALITY_EPS)
        .map(|(node, _)| node)
        .collect()
}

/// Returns the rounded up objective of the relaxation of `graph`, a lower bound on the size of
/// every dominating set of `graph`.
pub fn lp_lower_bound<O: RelaxationOracle + ?Sized>(oracle: &O, graph: &DyUGraph) -> Result<usize, ProcessingError> {
    let values = oracle.solve(graph)?;
    Ok((objective(&values) - INTEGRALITY_EPS).ceil().max(0.0) as usize)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An oracle that never finds a solution.
    pub(crate) struct FailingOracle;

    impl RelaxationOracle for FailingOracle {
        fn solve_fixed(&self, _: &DyUGraph, _: &FxHashSet<usize>, _: &FxHashSet<usize>)
            -> Result<FractionalAssignment, ProcessingError> {
            Err(ProcessingError::RelaxationInfeasible)
        }
    }

    fn satisfies_constraints(graph: &DyUGraph, values: &[f64]) -> bool {
        graph.nodes().all(|node| {
            let covered: f64 = values[node] + graph.neighbors(node).as_ref().unwrap()
                .iter()
                .map(|neigh| values[*neigh])
                .sum::<f64>();
            covered >= 1.0 - 1e-6
        })
    }

    #[test]
    fn cycle_relaxation_test() {
        let graph = DyUGraph::from_edges(4, &[(1, 2), (2, 3), (3, 4), (4, 1)]);
        let values = SimplexOracle.solve(&graph).unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], 0.0);
        assert!(satisfies_constraints(&graph, &values));
        assert!((objective(&values) - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(lp_lower_bound(&SimplexOracle, &graph).unwrap(), 2);
    }

    #[test]
    fn star_relaxation_test() {
        let graph = DyUGraph::from_edges(6, &[(1, 2), (1, 3), (1, 4), (1, 5), (1, 6)]);
        let values = SimplexOracle.solve(&graph).unwrap();
        assert!((objective(&values) - 1.0).abs() < 1e-6);
        assert_eq!(lp_lower_bound(&SimplexOracle, &graph).unwrap(), 1);
    }

    #[test]
    fn fixed_values_test() {
        let graph = DyUGraph::from_edges(3, &[(1, 2), (2, 3)]);
        let zero: FxHashSet<usize> = vec![2].into_iter().collect();
        let values = SimplexOracle.solve_fixed(&graph, &FxHashSet::default(), &zero).unwrap();
        assert_eq!(values[2], 0.0);
        assert_eq!(values[1], 1.0);
        assert_eq!(values[3], 1.0);
        assert!(is_integral(&values));
        assert_eq!(ones(&values), vec![1, 3].into_iter().collect());
    }

    #[test]
    fn infeasible_fixing_test() {
        let graph = DyUGraph::from_edges(3, &[(1, 2)]);
        let zero: FxHashSet<usize> = vec![3].into_iter().collect();
        assert_eq!(SimplexOracle.solve_fixed(&graph, &FxHashSet::default(), &zero),
            Err(ProcessingError::RelaxationInfeasible));
        let both: FxHashSet<usize> = vec![1].into_iter().collect();
        assert_eq!(SimplexOracle.solve_fixed(&graph, &both, &both),
            Err(ProcessingError::RelaxationInfeasible));
    }

}
