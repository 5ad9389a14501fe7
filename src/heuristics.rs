//! Implementation of several heuristics and approximations that construct an initial dominating
//! set.
//!
//! * `ln_approx_ds` greedily takes the node of highest degree: an `O(ln n)` approximation.
//! * `two_approx_ds` takes both ends of random edges.
//! * `relaxation_ds` rounds an optimal fractional assignment.

use fxhash::FxHashSet;
use rand::Rng;
use crate::cust_error::ProcessingError;
use crate::graph::DyUGraph;
use crate::relaxation::RelaxationOracle;
use crate::rounding::{iterative_rounding, threshold_rounding, MAX_REFINEMENT_ROUNDS};

/// The construction heuristics the pipeline can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    GreedyLn,
    RandomEdge,
    /// Relaxation followed by `threshold_rounding`.
    RelaxationRounding,
    /// Relaxation followed by `iterative_rounding` with at most `max_rounds` re-solves.
    RelaxationRoundingV2 { max_rounds: usize },
}

impl Default for Construction {
    fn default() -> Self {
        Construction::GreedyLn
    }
}

impl Construction {

    /// The iterative rounding variant with the default number of re-solves.
    pub fn iterative() -> Self {
        Construction::RelaxationRoundingV2 { max_rounds: MAX_REFINEMENT_ROUNDS }
    }

    /// Checks if `self` needs the relaxation oracle.
    pub fn uses_relaxation(&self) -> bool {
        matches!(self, Construction::RelaxationRounding | Construction::RelaxationRoundingV2 { .. })
    }

    /// Builds a dominating set of `graph` and strips its redundant members.
    ///
    /// Fails with `ProcessingError::RelaxationInfeasible` if a relaxation based construction was
    /// chosen and `oracle` failed.
    pub fn build<O: RelaxationOracle + ?Sized, R: Rng>(
        &self,
        graph: &DyUGraph,
        oracle: &O,
        rng: &mut R,
    ) -> Result<FxHashSet<usize>, ProcessingError> {
        let mut ds = match self {
            Construction::GreedyLn => graph.ln_approx_ds(),
            Construction::RandomEdge => graph.two_approx_ds(rng),
            Construction::RelaxationRounding => relaxation_ds(graph, oracle)?,
            Construction::RelaxationRoundingV2 { max_rounds } => {
                let values = oracle.solve(graph)?;
                iterative_rounding(oracle, graph, &values, &FxHashSet::default(), *max_rounds).1
            },
        };
        graph.remove_redundant(&mut ds);
        Ok(ds)
    }
}

/// Solves the relaxation of `graph` and rounds it with `threshold_rounding`.
pub fn relaxation_ds<O: RelaxationOracle + ?Sized>(graph: &DyUGraph, oracle: &O) -> Result<FxHashSet<usize>, ProcessingError> {
    let values = oracle.solve(graph)?;
    Ok(threshold_rounding(graph, &values).1)
}

impl DyUGraph {

    /// Approximates a minimum dominating set by repeatedly adding the node with the highest
    /// degree and removing it together with its neighbors, until no edge remains. Every node that
    /// was never dominated is added at the end.
    pub fn ln_approx_ds(&self) -> FxHashSet<usize> {
        let mut clone = self.clone();
        let mut ds = FxHashSet::default();
        let mut dominated = FxHashSet::default();
        while clone.has_edges() {
            let max_node = clone.max_degree_node().expect("`clone` has edges");
            let neighbors = clone.delete_node(max_node).expect("`max_node` exists");
            ds.insert(max_node);
            dominated.insert(max_node);
            for neigh in neighbors {
                clone.delete_node(neigh);
                dominated.insert(neigh);
            }
        }
        ds.extend(self.nodes().filter(|node| !dominated.contains(node)));
        ds
    }

    /// Approximates a minimum dominating set by repeatedly adding both ends of a random edge and
    /// removing them together with their neighbors, until no edge remains. Every node that was
    /// never dominated is added at the end.
    pub fn two_approx_ds<R: Rng>(&self, rng: &mut R) -> FxHashSet<usize> {
        let mut clone = self.clone();
        let mut ds = FxHashSet::default();
        let mut dominated = FxHashSet::default();
        while let Some((src, trg)) = clone.random_edge(rng) {
            let mut closed = clone.closed_neighbors(src).expect("`src` exists");
            closed.extend(clone.closed_neighbors(trg).expect("`trg` exists"));
            ds.insert(src);
            ds.insert(trg);
            for node in closed {
                clone.delete_node(node);
                dominated.insert(node);
            }
        }
        ds.extend(self.nodes().filter(|node| !dominated.contains(node)));
        ds
    }

}
