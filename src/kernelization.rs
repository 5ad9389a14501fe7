//! This module includes the reduction rules for the dominating set problem.
//!
//! Both rules look at the neighborhood `N(A)` of a set of anchors `A` and split it into:
//! * `exit`: neighbors with a neighbor outside of `N[A]`,
//! * `guard`: the remaining neighbors that are adjacent to an `exit` node,
//! * `prison`: the rest. Nothing outside of `N[A]` can dominate them.
//!
//! The rules are:
//! * `SingleAnchor`: if the prison of a single node `v` is not empty, `v` can be taken into the
//!   solution. Guard and prison are replaced by one gadget node attached to `v`.
//! * `PairAnchor`: the same for a pair `{v, u}`, if no single node dominates the prison. Depending
//!   on which of `v` and `u` alone dominates the prison, a part of the guard and the prison are
//!   replaced by up to two gadget nodes. Only a random sample of nodes is used as `v`.
//!
//! A dominating set of the kernel is turned into one of the original graph by
//! `Kernelizer::lift_solution`, which replaces every gadget node with the anchor it stands in for.

use std::collections::BinaryHeap;
use fxhash::{FxHashMap, FxHashSet};
use rand::Rng;
use rand::seq::IteratorRandom;
use crate::graph::DyUGraph;

pub const SINGLE_ONLY: &[Rule] = &[Rule::SingleAnchor];
pub const ALL_RULES: &[Rule] = &[Rule::SingleAnchor, Rule::PairAnchor];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    SingleAnchor,
    PairAnchor,
}

/// Configuration of the kernelizer.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelOptions {
    /// The rules to apply in each pass, in this order.
    ///
    /// Defaults to `ALL_RULES`.
    pub rules: Vec<Rule>,
    /// The number of nodes drawn as first anchor of `Rule::PairAnchor`.
    ///
    /// Defaults to `250`.
    pub pair_sample_size: usize,
    /// The maximum number of passes over all rules.
    ///
    /// Defaults to `64`.
    pub max_passes: usize,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            rules: ALL_RULES.to_vec(),
            pair_sample_size: 250,
            max_passes: 64,
        }
    }
}

impl KernelOptions {
    pub fn with_rules(mut self, rules: &[Rule]) -> Self {
        self.rules = rules.to_vec();
        self
    }

    pub fn with_pair_sample_size(mut self, size: usize) -> Self {
        self.pair_sample_size = size;
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }
}

/// The split of the neighborhood of some anchors.
#[derive(Debug, Default)]
struct Classification {
    exit: FxHashSet<usize>,
    guard: FxHashSet<usize>,
    prison: FxHashSet<usize>,
}

/// Owns the graph while it is reduced, together with a neighbor index derived from it. All
/// changes go through `delete_region` and `attach_gadget`, which keep both in sync.
#[derive(Debug, Clone)]
pub struct Kernelizer {
    graph: DyUGraph,
    neighbors: FxHashMap<usize, FxHashSet<usize>>,
    /// Maps each gadget node to its anchors. The first one replaces it in a lifted solution.
    gadgets: FxHashMap<usize, Vec<usize>>,
    sample: Vec<usize>,
    options: KernelOptions,
    reductions: usize,
}

impl Kernelizer {

    /// Takes ownership of `graph` and draws the anchor sample for `Rule::PairAnchor`.
    pub fn new<R: Rng>(graph: DyUGraph, options: KernelOptions, rng: &mut R) -> Self {
        let sample = graph.nodes().choose_multiple(rng, options.pair_sample_size);
        let mut kernelizer = Kernelizer {
            graph,
            neighbors: FxHashMap::default(),
            gadgets: FxHashMap::default(),
            sample,
            options,
            reductions: 0,
        };
        kernelizer.rebuild_index();
        kernelizer
    }

    /// The current kernel.
    pub fn graph(&self) -> &DyUGraph {
        &self.graph
    }

    /// The number of times a rule fired.
    pub fn reductions(&self) -> usize {
        self.reductions
    }

    /// Checks if `node` was introduced by a reduction.
    pub fn is_gadget(&self, node: usize) -> bool {
        self.gadgets.contains_key(&node)
    }

    /// Rebuilds the neighbor index from the graph.
    pub fn rebuild_index(&mut self) {
        self.neighbors = self.graph
            .nodes()
            .map(|node| (node, self.graph.neighbors(node).as_ref().expect("`node` exists").clone()))
            .collect();
    }

    fn neighbors_of(&self, node: usize) -> &FxHashSet<usize> {
        self.neighbors.get(&node).expect("`node` is indexed")
    }

    /// Splits the neighborhood of `anchors` into exit, guard and prison.
    fn classify(&self, anchors: &[usize]) -> Classification {
        let mut union: FxHashSet<usize> = FxHashSet::default();
        for anchor in anchors {
            union.extend(self.neighbors_of(*anchor));
        }
        for anchor in anchors {
            union.remove(anchor);
        }
        let inside = |node: &usize| union.contains(node) || anchors.contains(node);
        let mut classes = Classification::default();
        for node in &union {
            if self.neighbors_of(*node).iter().any(|neigh| !inside(neigh)) {
                classes.exit.insert(*node);
            }
        }
        for node in union.difference(&classes.exit) {
            if self.neighbors_of(*node).iter().any(|neigh| classes.exit.contains(neigh)) {
                classes.guard.insert(*node);
            } else {
                classes.prison.insert(*node);
            }
        }
        classes
    }

    /// Removes all nodes of `region` from the index and from the graph.
    fn delete_region(&mut self, region: &FxHashSet<usize>) {
        for node in region {
            if let Some(old_neighbors) = self.neighbors.remove(node) {
                for neigh in old_neighbors {
                    if let Some(nn) = self.neighbors.get_mut(&neigh) {
                        nn.remove(node);
                    }
                }
            }
        }
        self.graph.delete_nodes(region);
    }

    /// Adds a gadget node adjacent to all of `anchors` that becomes `substitute` in a lifted
    /// solution.
    /// Returns the id of the gadget.
    fn attach_gadget(&mut self, anchors: &[usize], substitute: usize) -> usize {
        let gadget = self.graph.add_node();
        for anchor in anchors {
            self.graph.add_edge(*anchor, gadget);
            self.neighbors.get_mut(anchor).expect("`anchor` is indexed").insert(gadget);
        }
        self.neighbors.insert(gadget, anchors.iter().copied().collect());
        let mut order = vec![substitute];
        order.extend(anchors.iter().filter(|anchor| **anchor != substitute));
        self.gadgets.insert(gadget, order);
        gadget
    }

    /// Checks if replacing `region` gains anything: either it holds more than `max_len` nodes, or
    /// it is not empty and a representative node has a degree above `min_degree`.
    fn worth_replacing(&self, region: &FxHashSet<usize>, max_len: usize, min_degree: usize) -> bool {
        if region.len() > max_len {
            return true
        }
        match region.iter().min() {
            Some(rep) => self.graph.degree(*rep).unwrap_or(0) > min_degree,
            None => false,
        }
    }

    /// Applies `Rule::SingleAnchor` once to every node.
    /// Returns `true` if at least one reduction has been applied.
    pub fn single_anchor_rule(&mut self) -> bool {
        let mut changed = false;
        let nodes: Vec<usize> = self.graph.nodes().collect();
        for node in nodes {
            // `node` could have been removed by now.
            if !self.graph.has_node(node) {
                continue
            }
            let classes = self.classify(&[node]);
            if classes.prison.is_empty() {
                continue
            }
            let region: FxHashSet<usize> = classes.guard.union(&classes.prison).copied().collect();
            if self.worth_replacing(&region, 1, 1) {
                self.delete_region(&region);
                self.attach_gadget(&[node], node);
                self.reductions += 1;
                changed = true;
            }
        }
        changed
    }

    /// Applies `Rule::PairAnchor` to every pair of a sampled node and another node.
    /// Returns `true` if at least one reduction has been applied.
    pub fn pair_anchor_rule(&mut self) -> bool {
        let mut changed = false;
        let nodes: Vec<usize> = self.graph.nodes().collect();
        let sample = self.sample.clone();
        for v in sample {
            for &u in &nodes {
                if u == v || !self.graph.has_node(u) || !self.graph.has_node(v) {
                    continue
                }
                if self.reduce_pair(v, u) {
                    self.reductions += 1;
                    changed = true;
                }
            }
        }
        changed
    }

    fn reduce_pair(&mut self, v: usize, u: usize) -> bool {
        let classes = self.classify(&[v, u]);
        if classes.prison.is_empty() {
            return false
        }
        let solo_dominated = classes.guard.union(&classes.prison).any(|node| {
            let neighs = self.neighbors_of(*node);
            classes.prison.iter().all(|p| p == node || neighs.contains(p))
        });
        if solo_dominated {
            return false
        }
        let v_neig = self.neighbors_of(v).clone();
        let u_neig = self.neighbors_of(u).clone();
        let by_v = classes.prison.is_subset(&v_neig);
        let by_u = classes.prison.is_subset(&u_neig);
        let mut region = classes.prison.clone();
        match (by_v, by_u) {
            (true, true) => {
                region.extend(classes.guard.iter().filter(|g| v_neig.contains(*g) && u_neig.contains(*g)));
                if !self.worth_replacing(&region, 2, 2) {
                    return false
                }
                self.delete_region(&region);
                self.attach_gadget(&[v, u], v);
                self.attach_gadget(&[v, u], u);
            },
            (true, false) => {
                region.extend(classes.guard.intersection(&v_neig));
                if !self.worth_replacing(&region, 1, 1) {
                    return false
                }
                self.delete_region(&region);
                self.attach_gadget(&[v], v);
            },
            (false, true) => {
                region.extend(classes.guard.intersection(&u_neig));
                if !self.worth_replacing(&region, 1, 1) {
                    return false
                }
                self.delete_region(&region);
                self.attach_gadget(&[u], u);
            },
            (false, false) => {
                region.extend(&classes.guard);
                if !self.worth_replacing(&region, 2, 1) {
                    return false
                }
                self.delete_region(&region);
                self.attach_gadget(&[v], v);
                self.attach_gadget(&[u], u);
            },
        }
        true
    }

    /// Applies the configured rules pass by pass, until a pass changes nothing, the number of
    /// nodes stays the same, or `max_passes` is reached.
    /// Returns the number of passes that changed the graph.
    pub fn exhaustive_rules(&mut self) -> usize {
        let mut size = self.graph.num_nodes();
        let rules = self.options.rules.clone();
        let mut passes = 0;
        while passes < self.options.max_passes {
            let mut changed = false;
            for rule in &rules {
                changed |= match rule {
                    Rule::SingleAnchor => self.single_anchor_rule(),
                    Rule::PairAnchor => self.pair_anchor_rule(),
                };
            }
            if !changed {
                break
            }
            passes += 1;
            let new_size = self.graph.num_nodes();
            log::debug!("kernel pass {}: {} -> {} nodes", passes, size, new_size);
            if new_size == size {
                break
            }
            size = new_size;
        }
        passes
    }

    /// Turns a dominating set of the kernel into a dominating set of the graph the kernelizer was
    /// created with, of at most the same size.
    ///
    /// Gadgets are undone from the newest to the oldest. Each one is replaced by its first anchor
    /// that is not yet in the set, or dropped if all of them are.
    pub fn lift_solution(&self, ds: &FxHashSet<usize>) -> FxHashSet<usize> {
        let mut lifted = ds.clone();
        let mut pending: BinaryHeap<usize> = ds.iter().copied().filter(|node| self.is_gadget(*node)).collect();
        while let Some(gadget) = pending.pop() {
            if !lifted.remove(&gadget) {
                continue
            }
            let anchors = self.gadgets.get(&gadget).expect("`gadget` was attached");
            if let Some(anchor) = anchors.iter().find(|anchor| !lifted.contains(*anchor)) {
                lifted.insert(*anchor);
                if self.is_gadget(*anchor) {
                    pending.push(*anchor);
                }
            }
        }
        lifted
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use proptest::prelude::*;

    fn kernelizer(graph: DyUGraph, rules: &[Rule]) -> Kernelizer {
        let mut rng = StdRng::seed_from_u64(5);
        let n = graph.num_nodes();
        Kernelizer::new(graph, KernelOptions::default().with_rules(rules).with_pair_sample_size(n), &mut rng)
    }

    #[test]
    fn single_edge_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 2 1\n1 2\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), ALL_RULES);
        assert_eq!(kern.exhaustive_rules(), 0);
        assert_eq!(kern.graph(), &graph);
        assert_eq!(kern.reductions(), 0);
    }

    #[test]
    fn single_anchor_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 6 6\n1 2\n1 3\n1 4\n2 3\n4 5\n5 6\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), SINGLE_ONLY);
        assert!(kern.single_anchor_rule());
        assert!(!kern.single_anchor_rule());
        assert_eq!(kern.graph().num_nodes(), 5);
        assert!(!kern.graph().has_node(2));
        assert!(!kern.graph().has_node(3));
        assert!(kern.is_gadget(7));
        assert!(kern.graph().edge_exists((1, 7)));
        let lifted = kern.lift_solution(&vec![7, 5].into_iter().collect());
        assert_eq!(lifted, vec![1, 5].into_iter().collect());
        assert!(graph.is_dominating_set(&lifted));
    }

    #[test]
    fn two_anchor_lift_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 3 2\n1 3\n2 3\n")).unwrap();
        let mut kern = kernelizer(graph, SINGLE_ONLY);
        let z1 = kern.attach_gadget(&[1, 2], 1);
        let z2 = kern.attach_gadget(&[1, 2], 2);
        let both: FxHashSet<usize> = vec![1, 2].into_iter().collect();
        assert_eq!(kern.lift_solution(&vec![z1, 1].into_iter().collect()), both);
        assert_eq!(kern.lift_solution(&vec![z1, z2].into_iter().collect()), both);
        assert_eq!(kern.lift_solution(&vec![z1, 2].into_iter().collect()), both);
        assert_eq!(kern.lift_solution(&vec![z1, 1, 2].into_iter().collect()), both);
    }

    #[test]
    fn index_stays_in_sync_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 8 9\n1 2\n1 3\n2 3\n1 4\n4 5\n5 6\n5 7\n6 7\n7 8\n")).unwrap();
        let mut kern = kernelizer(graph, ALL_RULES);
        kern.exhaustive_rules();
        let index = kern.neighbors.clone();
        kern.rebuild_index();
        assert_eq!(index, kern.neighbors);
    }

    #[test]
    fn pair_anchor_test() {
        // The prison {3, 4, 5} of {1, 2} is only dominated by both anchors together.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 9 8\n1 3\n1 4\n2 4\n2 5\n1 6\n2 7\n6 8\n7 9\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        kern.sample = vec![1];
        assert!(kern.reduce_pair(1, 2));
        for node in [3, 4, 5] {
            assert!(!kern.graph().has_node(node));
        }
        assert!(kern.is_gadget(10));
        assert!(kern.is_gadget(11));
        assert!(kern.graph().edge_exists((1, 10)));
        assert!(kern.graph().edge_exists((2, 11)));
        assert!(!kern.graph().edge_exists((2, 10)));
        // further pairs may fire on the new gadgets
        kern.pair_anchor_rule();
        let kernel = kern.graph().clone();
        let ds = kernel.ln_approx_ds();
        let lifted = kern.lift_solution(&ds);
        assert!(lifted.len() <= ds.len());
        assert!(graph.is_dominating_set(&lifted));
    }

    #[test]
    fn pair_neither_threshold_test() {
        // Two prison nodes of degree 1 are not worth two gadgets.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 4 2\n1 3\n2 4\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(!kern.reduce_pair(1, 2));
        assert_eq!(kern.graph(), &graph);
    }

    #[test]
    fn pair_both_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 5 6\n1 3\n2 3\n1 4\n2 4\n1 5\n2 5\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(kern.reduce_pair(1, 2));
        assert_eq!(kern.graph().num_nodes(), 4);
        for gadget in [6, 7] {
            assert!(kern.is_gadget(gadget));
            assert!(kern.graph().edge_exists((1, gadget)));
            assert!(kern.graph().edge_exists((2, gadget)));
        }
        let both: FxHashSet<usize> = vec![1, 2].into_iter().collect();
        assert_eq!(kern.lift_solution(&vec![6, 7].into_iter().collect()), both);
        assert!(graph.is_dominating_set(&both));
    }

    #[test]
    fn pair_both_threshold_test() {
        // Two prison nodes of degree 2 stay.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 4 4\n1 3\n2 3\n1 4\n2 4\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(!kern.reduce_pair(1, 2));
        assert_eq!(kern.graph(), &graph);

        // Node 3 also sees the guard 5, which is only adjacent to 1. Its degree of 3 suffices.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 7 9\n1 3\n2 3\n1 4\n2 4\n3 5\n1 5\n5 6\n1 6\n6 7\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(kern.reduce_pair(1, 2));
        assert!(!kern.graph().has_node(3));
        assert!(!kern.graph().has_node(4));
        assert!(kern.graph().edge_exists((1, 5)));
        for gadget in [8, 9] {
            assert!(kern.graph().edge_exists((1, gadget)));
            assert!(kern.graph().edge_exists((2, gadget)));
        }
    }

    #[test]
    fn pair_one_sided_test() {
        // Only 1 dominates the prison {3, 4}. The guard 7 is adjacent to 1, the guard 8 is not.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 8 9\n1 3\n1 4\n2 4\n2 5\n5 6\n1 7\n5 7\n2 8\n5 8\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(kern.reduce_pair(1, 2));
        for node in [3, 4, 7] {
            assert!(!kern.graph().has_node(node));
        }
        assert!(kern.graph().has_node(8));
        assert!(kern.is_gadget(9));
        assert_eq!(kern.graph().degree(9), Some(1));
        assert!(kern.graph().edge_exists((1, 9)));
        let lifted = kern.lift_solution(&vec![9, 5].into_iter().collect());
        assert_eq!(lifted, vec![1, 5].into_iter().collect());
        assert!(graph.is_dominating_set(&lifted));

        // the same reduction with swapped anchors
        let mut swapped = kernelizer(graph, &[Rule::PairAnchor]);
        assert!(swapped.reduce_pair(2, 1));
        assert_eq!(swapped.graph(), kern.graph());
        assert!(swapped.graph().edge_exists((1, 9)));
    }

    #[test]
    fn pair_solo_dominated_test() {
        // Node 5 alone dominates the prison {3, 4, 5}.
        let graph = DyUGraph::read_gr(Cursor::new("p ds 5 6\n1 3\n1 5\n2 4\n2 5\n3 5\n4 5\n")).unwrap();
        let mut kern = kernelizer(graph.clone(), &[Rule::PairAnchor]);
        assert!(!kern.reduce_pair(1, 2));
        assert_eq!(kern.graph(), &graph);
        assert_eq!(kern.reductions(), 0);
    }

    proptest! {
        #[test]
        fn lifted_kernel_solutions_dominate(
            edges in proptest::collection::vec((1usize..=16, 1usize..=16), 0..40),
            seed in any::<u64>(),
        ) {
            let graph = DyUGraph::from_edges(16, &edges);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut kern = Kernelizer::new(graph.clone(), KernelOptions::default().with_pair_sample_size(16), &mut rng);
            kern.exhaustive_rules();
            let kernel_ds = kern.graph().ln_approx_ds();
            prop_assert!(kern.graph().is_dominating_set(&kernel_ds));
            let lifted = kern.lift_solution(&kernel_ds);
            prop_assert!(lifted.len() <= kernel_ds.len());
            prop_assert!(graph.is_dominating_set(&lifted));
        }
    }

}
