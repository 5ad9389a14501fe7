//! Simulated annealing on dominating sets.
//!
//! A move removes a batch of members and repairs the set right away, so every candidate that is
//! judged by the Metropolis criterion is already a dominating set. The batch shrinks with every
//! temperature level.

use std::time::Instant;
use fxhash::FxHashSet;
use rand::Rng;
use rand::seq::SliceRandom;
use crate::cust_error::ProcessingError;
use crate::events::SearchEvent;
use crate::graph::DyUGraph;
use crate::heuristics::Construction;
use crate::relaxation::RelaxationOracle;

/// How the temperature falls after each level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoolingSchedule {
    /// `T <- rate * T`
    Exponential { rate: f64 },
    /// `T <- T_0 / (1 + k)^0.8` after level `k`.
    Polynomial,
    /// `T <- (0.9 - cooling_rate) * T` if more than `target_acceptance` of the moves of the last
    /// level were accepted, `T <- (0.9 + cooling_rate) * T` otherwise.
    Adaptive { cooling_rate: f64, target_acceptance: f64 },
    /// `T <- rate * T` after every fifth level.
    Stepped { rate: f64 },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Exponential { rate: 0.9 }
    }
}

impl CoolingSchedule {

    /// Returns the temperature after `level` levels, given the current temperature `temp`, the
    /// initial temperature and the fraction of accepted moves of the last level.
    /// The result is always positive.
    pub fn next_temperature(&self, temp: f64, initial: f64, level: usize, acceptance: f64) -> f64 {
        let next = match self {
            CoolingSchedule::Exponential { rate } => temp * rate,
            CoolingSchedule::Polynomial => initial / ((1 + level) as f64).powf(0.8),
            CoolingSchedule::Adaptive { cooling_rate, target_acceptance } => {
                if acceptance > *target_acceptance {
                    temp * (0.9 - cooling_rate)
                } else {
                    temp * (0.9 + cooling_rate)
                }
            },
            CoolingSchedule::Stepped { rate } => {
                if level % 5 == 0 {
                    temp * rate
                } else {
                    temp
                }
            },
        };
        if next > 0.0 {
            next
        } else {
            f64::MIN_POSITIVE
        }
    }

    fn validate(&self) -> Result<(), ProcessingError> {
        match self {
            CoolingSchedule::Exponential { rate } | CoolingSchedule::Stepped { rate } => {
                if !(*rate > 0.0 && *rate < 1.0) {
                    return Err(ProcessingError::InvalidParameter(format!("cooling rate {} is not in (0,1)", rate)))
                }
            },
            CoolingSchedule::Adaptive { cooling_rate, target_acceptance } => {
                if !cooling_rate.is_finite() || *cooling_rate < 0.0 {
                    return Err(ProcessingError::InvalidParameter(format!("cooling rate {} is negative", cooling_rate)))
                }
                if !(0.0..=1.0).contains(target_acceptance) {
                    return Err(ProcessingError::InvalidParameter(
                        format!("target acceptance {} is not in [0,1]", target_acceptance)))
                }
            },
            CoolingSchedule::Polynomial => (),
        }
        Ok(())
    }
}

/// Configuration of `DSAnnealing::anneal`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingOptions {
    /// Defaults to `0.1`.
    pub initial_temperature: f64,
    /// The annealing stops once the temperature is not above this. Defaults to `0.01`.
    pub min_temperature: f64,
    /// Scales the number of moves per level and the acceptance pressure with the number of
    /// nodes `n`: both are `max(1, floor(n * alpha))`. Defaults to `0.1`.
    pub alpha: f64,
    /// Overrides the number of moves per level.
    pub moves_per_level: Option<usize>,
    /// A move in level `k` removes `max(1, floor(n * batch_ratio / (1 + k)))` members.
    /// Defaults to `0.01`.
    pub batch_ratio: f64,
    pub cooling: CoolingSchedule,
    /// Hard limit on the number of levels. Defaults to `100_000`.
    pub max_levels: usize,
    /// The annealing stops at this point in time and reports the best set found so far.
    pub deadline: Option<Instant>,
}

impl Default for AnnealingOptions {
    fn default() -> Self {
        Self {
            initial_temperature: 0.1,
            min_temperature: 0.01,
            alpha: 0.1,
            moves_per_level: None,
            batch_ratio: 0.01,
            cooling: CoolingSchedule::default(),
            max_levels: 100_000,
            deadline: None,
        }
    }
}

impl AnnealingOptions {
    pub fn with_initial_temperature(mut self, temp: f64) -> Self {
        self.initial_temperature = temp;
        self
    }

    pub fn with_min_temperature(mut self, temp: f64) -> Self {
        self.min_temperature = temp;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_moves_per_level(mut self, moves: usize) -> Self {
        self.moves_per_level = Some(moves);
        self
    }

    pub fn with_batch_ratio(mut self, ratio: f64) -> Self {
        self.batch_ratio = ratio;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if !(self.initial_temperature > 0.0) || !self.initial_temperature.is_finite() {
            return Err(ProcessingError::InvalidParameter(
                format!("initial temperature {} is not positive", self.initial_temperature)))
        }
        if !(self.min_temperature >= 0.0) {
            return Err(ProcessingError::InvalidParameter(
                format!("minimum temperature {} is negative", self.min_temperature)))
        }
        if !(self.alpha > 0.0) || !self.alpha.is_finite() {
            return Err(ProcessingError::InvalidParameter(format!("alpha {} is not positive", self.alpha)))
        }
        if !(self.batch_ratio >= 0.0) || !self.batch_ratio.is_finite() {
            return Err(ProcessingError::InvalidParameter(format!("batch ratio {} is negative", self.batch_ratio)))
        }
        self.cooling.validate()
    }
}

/// Returns `max(1, floor(num_nodes * alpha))`.
pub fn level_scale(num_nodes: usize, alpha: f64) -> usize {
    ((num_nodes as f64 * alpha).floor() as usize).max(1)
}

/// Returns the number of members a move removes in level `level`.
pub fn batch_size(num_nodes: usize, batch_ratio: f64, level: usize) -> usize {
    ((num_nodes as f64 * batch_ratio / (1 + level) as f64).floor() as usize).max(1)
}

/// Removes `batch` random members of the dominating set `ds` and repairs the result: every
/// neighbor of a removed node that lost its last dominator joins the set, and a removed node
/// that is left undominated gets one of its neighbors back, or itself if it has none.
///
/// Returns the repaired set, which dominates `graph` whenever `ds` does.
pub fn perturb_and_repair<R: Rng>(
    graph: &DyUGraph,
    ds: &FxHashSet<usize>,
    batch: usize,
    rng: &mut R,
) -> Result<FxHashSet<usize>, ProcessingError> {
    let mut members: Vec<usize> = ds.iter().copied().collect();
    members.sort_unstable();
    let removed: Vec<usize> = members.choose_multiple(rng, batch.min(members.len())).copied().collect();
    let mut candidate = ds.clone();
    for node in &removed {
        candidate.remove(node);
    }
    for node in removed {
        let neighbors = graph.neighbors(node)
            .as_ref()
            .ok_or_else(|| ProcessingError::GraphError(format!("node {} was deleted", node)))?;
        for neigh in neighbors {
            if !graph.is_dominated(*neigh, &candidate) {
                candidate.insert(*neigh);
            }
        }
        if !graph.is_dominated(node, &candidate) {
            match graph.any_neighbor(node) {
                Ok(neigh) => candidate.insert(neigh),
                Err(ProcessingError::EmptyNeighborhood(_)) => candidate.insert(node),
                Err(e) => return Err(e),
            };
        }
    }
    Ok(candidate)
}

/// Decides if a move from a set of size `old_size` to one of size `new_size` is accepted.
///
/// The acceptance probability is `min(exp(delta * scale / temp), 1)` with
/// `delta = (old_size - new_size) / old_size`. Overflows saturate to `1` for improving moves
/// and to `0` for worsening moves.
pub fn metropolis_accept<R: Rng>(old_size: usize, new_size: usize, scale: f64, temp: f64, rng: &mut R) -> bool {
    if new_size <= old_size {
        return true
    }
    let delta = (old_size as f64 - new_size as f64) / old_size as f64;
    let prob = (delta * scale / temp).exp().min(1.0);
    rng.gen::<f64>() < prob
}

/// Simulated annealing that keeps track of the best dominating set it has seen.
#[derive(Debug, Clone)]
pub struct DSAnnealing<'a> {
    graph: &'a DyUGraph,
    ds: FxHashSet<usize>,
    best: FxHashSet<usize>,
}

impl<'a> DSAnnealing<'a> {

    /// Starts from the dominating set `ds` of `graph`.
    /// Fails with `ProcessingError::GraphError` if `ds` holds a node that is not in `graph`, and
    /// with `ProcessingError::NotDominatingSet` if `ds` does not dominate `graph`.
    pub fn new(graph: &'a DyUGraph, ds: FxHashSet<usize>) -> Result<Self, ProcessingError> {
        if let Some(node) = ds.iter().find(|node| !graph.has_node(**node)) {
            return Err(ProcessingError::GraphError(format!("node {} is not in the graph", node)))
        }
        graph.check_dominating_set(&ds)?;
        Ok(DSAnnealing {
            graph,
            best: ds.clone(),
            ds,
        })
    }

    /// Starts from a dominating set built by `construction`.
    pub fn from_construction<O: RelaxationOracle + ?Sized, R: Rng>(
        graph: &'a DyUGraph,
        construction: Construction,
        oracle: &O,
        rng: &mut R,
    ) -> Result<Self, ProcessingError> {
        let ds = construction.build(graph, oracle, rng)?;
        Self::new(graph, ds)
    }

    /// The current set.
    pub fn ds(&self) -> &FxHashSet<usize> {
        &self.ds
    }

    /// The smallest set seen so far.
    pub fn best(&self) -> &FxHashSet<usize> {
        &self.best
    }

    pub fn into_best(self) -> FxHashSet<usize> {
        self.best
    }

    /// Proposes a candidate that removes `batch` members of the current set and judges it.
    /// Returns `true` if the candidate was accepted.
    pub fn try_move<R: Rng>(&mut self, batch: usize, scale: f64, temp: f64, rng: &mut R) -> Result<bool, ProcessingError> {
        if self.ds.is_empty() {
            return Ok(false)
        }
        let candidate = perturb_and_repair(self.graph, &self.ds, batch, rng)?;
        if !metropolis_accept(self.ds.len(), candidate.len(), scale, temp, rng) {
            return Ok(false)
        }
        self.ds = candidate;
        if self.ds.len() < self.best.len() {
            self.best = self.ds.clone();
        }
        Ok(true)
    }

    /// Runs the annealing until the temperature reaches `options.min_temperature`, the level
    /// limit is hit or the deadline passes.
    ///
    /// Returns the best set found, stripped of redundant members and checked against the graph.
    pub fn anneal<R: Rng>(
        &mut self,
        options: &AnnealingOptions,
        rng: &mut R,
        sink: &mut dyn FnMut(&SearchEvent),
    ) -> Result<FxHashSet<usize>, ProcessingError> {
        options.validate()?;
        let n = self.graph.num_nodes();
        let scale = level_scale(n, options.alpha);
        let moves = options.moves_per_level.unwrap_or(scale).max(1);
        let mut temp = options.initial_temperature;
        let mut level = 0;
        while temp > options.min_temperature && level < options.max_levels {
            if options.deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                log::debug!("annealing reached its deadline after {} levels", level);
                break
            }
            let batch = batch_size(n, options.batch_ratio, level);
            let mut accepted = 0;
            for _ in 0..moves {
                if self.try_move(batch, scale as f64, temp, rng)? {
                    accepted += 1;
                }
            }
            level += 1;
            sink(&SearchEvent::LevelCompleted {
                level,
                temperature: temp,
                size: self.ds.len(),
                best: self.best.len(),
            });
            temp = options.cooling.next_temperature(temp, options.initial_temperature, level, accepted as f64 / moves as f64);
        }
        let mut result = self.best.clone();
        self.graph.remove_redundant(&mut result);
        self.graph.check_dominating_set(&result)?;
        log::debug!("annealing finished after {} levels with {} nodes", level, result.len());
        self.best = result.clone();
        Ok(result)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use proptest::prelude::*;
    use crate::events;

    fn cycle(n: usize) -> DyUGraph {
        let edges: Vec<(usize, usize)> = (1..=n).map(|i| (i, i % n + 1)).collect();
        DyUGraph::from_edges(n, &edges)
    }

    #[test]
    fn isolated_node_move_test() {
        let graph = DyUGraph::read_gr(Cursor::new("p ds 3 1\n1 2\n")).unwrap();
        let ds: FxHashSet<usize> = vec![1, 3].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(2);
        for batch in [1, 2, 5] {
            for _ in 0..20 {
                let candidate = perturb_and_repair(&graph, &ds, batch, &mut rng).unwrap();
                assert!(candidate.contains(&3));
                assert!(graph.is_dominating_set(&candidate));
            }
        }
    }

    #[test]
    fn metropolis_test() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(metropolis_accept(10, 9, 10.0, 0.01, &mut rng));
            assert!(metropolis_accept(10, 10, 10.0, 0.01, &mut rng));
            assert!(!metropolis_accept(10, 11, 10.0, 1e-3, &mut rng));
            assert!(!metropolis_accept(1, 1000, 1e6, f64::MIN_POSITIVE, &mut rng));
        }
    }

    #[test]
    fn schedule_test() {
        assert!((CoolingSchedule::Exponential { rate: 0.5 }.next_temperature(1.0, 1.0, 1, 0.0) - 0.5).abs() < 1e-12);
        assert_eq!(CoolingSchedule::Stepped { rate: 0.5 }.next_temperature(1.0, 1.0, 4, 0.0), 1.0);
        assert_eq!(CoolingSchedule::Stepped { rate: 0.5 }.next_temperature(1.0, 1.0, 5, 0.0), 0.5);
        let poly = CoolingSchedule::Polynomial.next_temperature(0.1, 1.0, 3, 0.0);
        assert!((poly - 1.0 / 4f64.powf(0.8)).abs() < 1e-12);
        let adaptive = CoolingSchedule::Adaptive { cooling_rate: 0.95, target_acceptance: 0.5 };
        assert_eq!(adaptive.next_temperature(1.0, 1.0, 1, 0.9), f64::MIN_POSITIVE);
        assert!((adaptive.next_temperature(1.0, 1.0, 1, 0.1) - 1.85).abs() < 1e-12);
    }

    #[test]
    fn anneal_test() {
        let graph = cycle(30);
        let schedules = [
            CoolingSchedule::default(),
            CoolingSchedule::Polynomial,
            CoolingSchedule::Adaptive { cooling_rate: 0.05, target_acceptance: 0.3 },
            CoolingSchedule::Stepped { rate: 0.8 },
        ];
        for (i, cooling) in schedules.into_iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(i as u64);
            let mut annealing = DSAnnealing::from_construction(&graph, Construction::RandomEdge, &crate::relaxation::SimplexOracle, &mut rng).unwrap();
            let initial = annealing.ds().len();
            let mut levels = 0;
            let options = AnnealingOptions::default().with_cooling(cooling).with_max_levels(2_000);
            let ds = annealing.anneal(&options, &mut rng, &mut |event| {
                if let SearchEvent::LevelCompleted { size, best, .. } = event {
                    assert!(best <= size);
                    levels += 1;
                }
            }).unwrap();
            assert!(levels > 0);
            assert!(graph.is_dominating_set(&ds));
            assert!(ds.len() <= initial);
            assert!(ds.len() >= 10);
        }
    }

    #[test]
    fn deadline_test() {
        let graph = cycle(12);
        let mut rng = StdRng::seed_from_u64(4);
        let ds = graph.ln_approx_ds();
        let mut annealing = DSAnnealing::new(&graph, ds.clone()).unwrap();
        let options = AnnealingOptions::default().with_deadline(Some(Instant::now()));
        let mut levels = 0;
        let result = annealing.anneal(&options, &mut rng, &mut |_| levels += 1).unwrap();
        assert_eq!(levels, 0);
        assert!(result.is_subset(&ds));
        assert!(graph.is_dominating_set(&result));
    }

    #[test]
    fn invalid_input_test() {
        let graph = cycle(5);
        assert!(matches!(DSAnnealing::new(&graph, vec![1].into_iter().collect()),
            Err(ProcessingError::NotDominatingSet(_))));
        let mut foreign = graph.ln_approx_ds();
        foreign.insert(graph.num_reserved() + 3);
        assert!(matches!(DSAnnealing::new(&graph, foreign), Err(ProcessingError::GraphError(_))));
        let mut annealing = DSAnnealing::new(&graph, graph.ln_approx_ds()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let options = AnnealingOptions::default().with_cooling(CoolingSchedule::Exponential { rate: 1.5 });
        assert!(matches!(annealing.anneal(&options, &mut rng, &mut events::ignore),
            Err(ProcessingError::InvalidParameter(_))));
        let options = AnnealingOptions::default().with_initial_temperature(0.0);
        assert!(matches!(annealing.anneal(&options, &mut rng, &mut events::ignore),
            Err(ProcessingError::InvalidParameter(_))));
    }

    #[test]
    fn empty_graph_test() {
        let graph = DyUGraph::new(0);
        let mut annealing = DSAnnealing::new(&graph, FxHashSet::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let ds = annealing.anneal(&AnnealingOptions::default(), &mut rng, &mut events::ignore).unwrap();
        assert!(ds.is_empty());
    }

    proptest! {
        #[test]
        fn repaired_moves_dominate(
            edges in proptest::collection::vec((1usize..=12, 1usize..=12), 0..30),
            batch in 1usize..6,
            seed in any::<u64>(),
        ) {
            let graph = DyUGraph::from_edges(12, &edges);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ds = graph.two_approx_ds(&mut rng);
            for _ in 0..10 {
                ds = perturb_and_repair(&graph, &ds, batch, &mut rng).unwrap();
                prop_assert!(graph.is_dominating_set(&ds));
            }
        }
    }

}
