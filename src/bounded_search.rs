//! Implementation of a bounded search tree over the relaxation.

use std::time::Instant;
use fxhash::FxHashSet;
use rand::Rng;
use crate::cust_error::ProcessingError;
use crate::graph::DyUGraph;
use crate::relaxation::{is_integral, objective, ones, FractionalAssignment, RelaxationOracle, INTEGRALITY_EPS};

/// Configuration of `lp_dive`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiveOptions {
    /// If the objectives of both children of a branch differ by more than this, the cheaper child
    /// is explored first, otherwise a random one. Defaults to `8.0`.
    pub gap_tolerance: f64,
    /// The maximum number of branches that are explored. Defaults to `1000`.
    pub max_branches: usize,
    pub deadline: Option<Instant>,
}

impl Default for DiveOptions {
    fn default() -> Self {
        Self {
            gap_tolerance: 8.0,
            max_branches: 1000,
            deadline: None,
        }
    }
}

impl DiveOptions {
    pub fn with_gap_tolerance(mut self, gap: f64) -> Self {
        self.gap_tolerance = gap;
        self
    }

    pub fn with_max_branches(mut self, branches: usize) -> Self {
        self.max_branches = branches;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

#[derive(Debug)]
struct Branch {
    fixed_one: FxHashSet<usize>,
    fixed_zero: FxHashSet<usize>,
    values: FractionalAssignment,
}

impl Branch {
    fn bound(&self) -> usize {
        (objective(&self.values) - INTEGRALITY_EPS).ceil().max(0.0) as usize
    }
}

/// Returns the fractional node whose value is closest to `0.5`.
fn branching_node(graph: &DyUGraph, values: &[f64]) -> Option<usize> {
    graph.nodes()
        .filter(|node| {
            let x = values[*node];
            x >= INTEGRALITY_EPS && x <= 1.0 - INTEGRALITY_EPS
        })
        .min_by(|a, b| {
            let da = (0.5 - values[*a]).abs();
            let db = (0.5 - values[*b]).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// A depth first search over the relaxation that branches on fractional nodes:
/// 1. Solves the relaxation of `graph` and pushes it as the first branch.
/// 2. Pops a branch. Branches whose rounded up objective is not smaller than the best known
///    size (initially the size of `incumbent`) are dropped.
/// 3. If the branch is integral, its ones form a dominating set that replaces the best known.
/// 4. Otherwise the node closest to `0.5` is fixed to `1` in one child and to `0` in the other.
///    Both children are solved, infeasible ones are dropped. The cheaper child is explored first
///    if the objectives differ by more than `options.gap_tolerance`, else a random one.
///
/// The search stops once the stack is empty, `options.max_branches` branches were explored or
/// the deadline passed.
/// Returns a dominating set that is smaller than `incumbent`, if one was found.
pub fn lp_dive<O: RelaxationOracle + ?Sized, R: Rng>(
    graph: &DyUGraph,
    oracle: &O,
    options: &DiveOptions,
    incumbent: Option<&FxHashSet<usize>>,
    rng: &mut R,
) -> Result<Option<FxHashSet<usize>>, ProcessingError> {
    let values = oracle.solve(graph)?;
    let mut best_size = incumbent.map_or(usize::MAX, |ds| ds.len());
    let mut best = None;
    let mut stack = vec![Branch {
        fixed_one: FxHashSet::default(),
        fixed_zero: FxHashSet::default(),
        values,
    }];
    let mut explored = 0;
    while let Some(branch) = stack.pop() {
        if explored >= options.max_branches {
            break
        }
        if options.deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            log::debug!("dive reached its deadline after {} branches", explored);
            break
        }
        explored += 1;
        if branch.bound() >= best_size {
            continue
        }
        if is_integral(&branch.values) {
            let mut ds = ones(&branch.values);
            graph.remove_redundant(&mut ds);
            if ds.len() < best_size && graph.is_dominating_set(&ds) {
                best_size = ds.len();
                best = Some(ds);
            }
            continue
        }
        let node = match branching_node(graph, &branch.values) {
            Some(node) => node,
            None => continue,
        };

        let mut one = branch.fixed_one.clone();
        one.insert(node);
        let take = oracle.solve_fixed(graph, &one, &branch.fixed_zero).ok().map(|values| Branch {
            fixed_one: one,
            fixed_zero: branch.fixed_zero.clone(),
            values,
        });
        let mut zero = branch.fixed_zero;
        zero.insert(node);
        let skip = oracle.solve_fixed(graph, &branch.fixed_one, &zero).ok().map(|values| Branch {
            fixed_one: branch.fixed_one,
            fixed_zero: zero,
            values,
        });

        // The child pushed last is explored first.
        match (take, skip) {
            (Some(take), Some(skip)) => {
                let (t, s) = (objective(&take.values), objective(&skip.values));
                let take_first = if (t - s).abs() > options.gap_tolerance {
                    t < s
                } else {
                    rng.gen_bool(0.5)
                };
                if take_first {
                    stack.push(skip);
                    stack.push(take);
                } else {
                    stack.push(take);
                    stack.push(skip);
                }
            },
            (Some(child), None) | (None, Some(child)) => stack.push(child),
            (None, None) => (),
        }
    }
    log::debug!("dive explored {} branches, best {:?}", explored, best.as_ref().map(|ds: &FxHashSet<usize>| ds.len()));
    Ok(best)
}
