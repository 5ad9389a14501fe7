//! Feasibility checks for dominating sets and the removal of redundant members.

use fxhash::FxHashSet;
use crate::cust_error::ProcessingError;
use crate::graph::DyUGraph;

impl DyUGraph {

    /// Checks if `node` is in `ds` or has a neighbor in `ds`.
    pub fn is_dominated(&self, node: usize, ds: &FxHashSet<usize>) -> bool {
        if ds.contains(&node) {
            return true
        }
        match self.neighbors(node) {
            Some(neighs) => neighs.iter().any(|neigh| ds.contains(neigh)),
            None => true,
        }
    }

    /// Checks if `node` has a neighbor in `ds` other than `except`.
    fn dominated_without(&self, node: usize, except: usize, ds: &FxHashSet<usize>) -> bool {
        match self.neighbors(node) {
            Some(neighs) => neighs.iter().any(|neigh| *neigh != except && ds.contains(neigh)),
            None => true,
        }
    }

    /// Returns all nodes that are neither in `ds` nor adjacent to a node in `ds`.
    pub fn undominated(&self, ds: &FxHashSet<usize>) -> Vec<usize> {
        self.nodes().filter(|node| !self.is_dominated(*node, ds)).collect()
    }

    /// Checks if `ds` dominates every node of `self`.
    pub fn is_dominating_set(&self, ds: &FxHashSet<usize>) -> bool {
        self.nodes().all(|node| self.is_dominated(node, ds))
    }

    /// Returns `Ok` if `ds` dominates `self`, and a `ProcessingError::NotDominatingSet` naming
    /// the first undominated node otherwise.
    pub fn check_dominating_set(&self, ds: &FxHashSet<usize>) -> Result<(), ProcessingError> {
        match self.nodes().find(|node| !self.is_dominated(*node, ds)) {
            Some(node) => Err(ProcessingError::NotDominatingSet(
                format!("node {} is not dominated by a set of size {}", node, ds.len()))),
            None => Ok(()),
        }
    }

    /// Checks if `member` can leave `ds` without breaking domination: `member` keeps a neighbor
    /// in `ds` and every neighbor outside of `ds` keeps another dominator.
    pub fn is_redundant(&self, member: usize, ds: &FxHashSet<usize>) -> bool {
        let neighbors = match self.neighbors(member) {
            Some(neighs) => neighs,
            None => return false,
        };
        let mut has_neig_in_ds = false;
        for neigh in neighbors {
            if ds.contains(neigh) {
                has_neig_in_ds = true;
            } else if !self.dominated_without(*neigh, member, ds) {
                return false
            }
        }
        has_neig_in_ds
    }

    /// Removes redundant members from `ds` in a single pass over a snapshot of `ds`. Each removal
    /// is visible to the checks of later members, so the result is a minimal dominating set if
    /// `ds` was dominating.
    ///
    /// Returns the number of removed members.
    pub fn remove_redundant(&self, ds: &mut FxHashSet<usize>) -> usize {
        let mut snapshot: Vec<usize> = ds.iter().copied().collect();
        snapshot.sort_unstable();
        let mut removed = 0;
        for member in snapshot {
            if self.is_redundant(member, ds) {
                ds.remove(&member);
                removed += 1;
            }
        }
        removed
    }

}
