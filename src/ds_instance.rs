//! Drives the solving pipeline on a single instance and keeps track of its bounds.

use std::io::{self, Write};
use std::time::{Duration, Instant};
use fxhash::FxHashSet;
use rand::Rng;
use crate::bounded_search::{lp_dive, DiveOptions};
use crate::cust_error::ProcessingError;
use crate::events::SearchEvent;
use crate::genetic::{DSGenetic, GeneticOptions};
use crate::graph::DyUGraph;
use crate::heuristics::Construction;
use crate::kernelization::{KernelOptions, Kernelizer};
use crate::local_search::{AnnealingOptions, DSAnnealing};
use crate::relaxation::{lp_lower_bound, RelaxationOracle};

/// Configuration of `DSInstance::solve`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Reduce the graph before searching. Defaults to `true`.
    pub kernelize: bool,
    pub kernel: KernelOptions,
    /// Defaults to `Construction::GreedyLn`.
    pub construction: Construction,
    pub annealing: AnnealingOptions,
    /// Runs the population refiner after the annealing. Off by default.
    pub genetic: Option<GeneticOptions>,
    /// Runs `lp_dive` at the end. Off by default.
    pub lp_dive: Option<DiveOptions>,
    /// Wall clock budget in seconds.
    pub timeout: Option<u64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            kernelize: true,
            kernel: KernelOptions::default(),
            construction: Construction::default(),
            annealing: AnnealingOptions::default(),
            genetic: None,
            lp_dive: None,
            timeout: None,
        }
    }
}

impl SolverOptions {
    pub fn with_kernelize(mut self, kernelize: bool) -> Self {
        self.kernelize = kernelize;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelOptions) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_construction(mut self, construction: Construction) -> Self {
        self.construction = construction;
        self
    }

    pub fn with_annealing(mut self, annealing: AnnealingOptions) -> Self {
        self.annealing = annealing;
        self
    }

    pub fn with_genetic(mut self, genetic: Option<GeneticOptions>) -> Self {
        self.genetic = genetic;
        self
    }

    pub fn with_lp_dive(mut self, dive: Option<DiveOptions>) -> Self {
        self.lp_dive = dive;
        self
    }

    pub fn with_timeout(mut self, seconds: Option<u64>) -> Self {
        self.timeout = seconds;
        self
    }
}

/// Returns the earlier of two optional deadlines.
fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.map_or(false, |deadline| Instant::now() >= deadline)
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DSInstance {
    pub graph: DyUGraph,
    pub lower_bound: Option<usize>,
    pub upper_bound: Option<usize>,
    pub current_best: Option<FxHashSet<usize>>,
}

impl DSInstance {

    pub fn new(graph: DyUGraph) -> Self {
        DSInstance {
            graph,
            lower_bound: None,
            upper_bound: None,
            current_best: None,
        }
    }

    /// Updates the lower bound.
    pub fn update_lower_bound(&mut self, lb: usize) {
        if let Some(ref mut lower) = self.lower_bound {
            if &lb > lower {
                *lower = lb
            }
        } else {
            self.lower_bound = Some(lb);
        }
    }

    /// Updates the current best solution and the upper bound.
    pub fn update_current_best(&mut self, some_sol: &FxHashSet<usize>) {
        if let Some(ref mut current_best) = self.current_best {
            if some_sol.len() < current_best.len() {
                *current_best = some_sol.clone();
                self.upper_bound = Some(some_sol.len());
            }
        } else {
            self.upper_bound = Some(some_sol.len());
            self.current_best = Some(some_sol.clone());
        }
    }

    /// Runs the pipeline on `self.graph`:
    /// 1. Kernelizes a copy of the graph, if `options.kernelize` is set.
    /// 2. Builds an initial set with `options.construction`. If the relaxation fails, the greedy
    ///    construction is used instead.
    /// 3. Anneals the set, then optionally refines it with the population and dives through the
    ///    relaxation.
    /// 4. Lifts the set back to `self.graph`, strips redundant members and validates it.
    /// 5. Records the set as current best and the rounded up relaxation as lower bound.
    ///
    /// If the timeout expires before any set exists, the current best of earlier runs is
    /// returned, or `ProcessingError::Timeout` if there is none.
    pub fn solve<O: RelaxationOracle + ?Sized, R: Rng>(
        &mut self,
        options: &SolverOptions,
        oracle: &O,
        rng: &mut R,
        sink: &mut dyn FnMut(&SearchEvent),
    ) -> Result<FxHashSet<usize>, ProcessingError> {
        let deadline = options.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
        let kernelizer = if options.kernelize {
            let before = self.graph.num_nodes();
            let mut kernelizer = Kernelizer::new(self.graph.clone(), options.kernel.clone(), rng);
            kernelizer.exhaustive_rules();
            let after = kernelizer.graph().num_nodes();
            log::info!("kernelized {} nodes to {} nodes with {} reductions", before, after, kernelizer.reductions());
            sink(&SearchEvent::Kernelized { before, after });
            Some(kernelizer)
        } else {
            None
        };
        let working = kernelizer.as_ref().map_or(&self.graph, |kernelizer| kernelizer.graph());
        let found = match search(working, options, oracle, rng, &mut *sink, deadline) {
            Ok(ds) => ds,
            Err(ProcessingError::Timeout) => {
                log::warn!("timeout before a dominating set was found");
                return self.current_best.clone().ok_or(ProcessingError::Timeout)
            },
            Err(e) => return Err(e),
        };
        let mut ds = match &kernelizer {
            Some(kernelizer) => kernelizer.lift_solution(&found),
            None => found,
        };
        self.graph.remove_redundant(&mut ds);
        self.graph.check_dominating_set(&ds)?;
        self.update_current_best(&ds);
        let best = self.current_best.clone().expect("`current_best` was just set");
        sink(&SearchEvent::Finished { size: best.len() });
        if !expired(deadline) {
            match lp_lower_bound(oracle, &self.graph) {
                Ok(lb) => self.update_lower_bound(lb),
                Err(e) => log::warn!("no lower bound: {}", e),
            }
        }
        log::info!("dominating set of size {}, lower bound {:?}", best.len(), self.lower_bound);
        Ok(best)
    }

    /// Checks if a solution is valid.
    pub fn validate_solution(&self, sol: &FxHashSet<usize>) -> bool {
        sol.iter().all(|node| self.graph.has_node(*node)) && self.graph.is_dominating_set(sol)
    }

}

/// Builds, anneals and refines a dominating set of `graph`.
fn search<O: RelaxationOracle + ?Sized, R: Rng>(
    graph: &DyUGraph,
    options: &SolverOptions,
    oracle: &O,
    rng: &mut R,
    sink: &mut dyn FnMut(&SearchEvent),
    deadline: Option<Instant>,
) -> Result<FxHashSet<usize>, ProcessingError> {
    if expired(deadline) {
        return Err(ProcessingError::Timeout)
    }
    let (construction, initial) = match options.construction.build(graph, oracle, rng) {
        Ok(ds) => (options.construction, ds),
        Err(ProcessingError::RelaxationInfeasible) => {
            log::warn!("relaxation failed, falling back to the greedy construction");
            (Construction::GreedyLn, Construction::GreedyLn.build(graph, oracle, rng)?)
        },
        Err(e) => return Err(e),
    };
    log::info!("{:?} constructed {} nodes", construction, initial.len());
    sink(&SearchEvent::Constructed { construction, size: initial.len() });

    let annealing_options = options.annealing.clone()
        .with_deadline(earliest(options.annealing.deadline, deadline));
    let mut annealing = DSAnnealing::new(graph, initial)?;
    let mut best = annealing.anneal(&annealing_options, rng, &mut *sink)?;
    log::info!("annealing found {} nodes", best.len());

    if let Some(genetic_options) = &options.genetic {
        if !expired(deadline) {
            let genetic_options = genetic_options.clone()
                .with_deadline(earliest(genetic_options.deadline, deadline));
            let mut genetic = DSGenetic::new(graph, oracle, &genetic_options, rng)?;
            let refined = genetic.evolve(&genetic_options, rng, &mut *sink)?;
            log::info!("population refinement found {} nodes", refined.len());
            if refined.len() < best.len() {
                best = refined;
            }
        }
    }

    if let Some(dive_options) = &options.lp_dive {
        if !expired(deadline) {
            let dive_options = dive_options.clone()
                .with_deadline(earliest(dive_options.deadline, deadline));
            match lp_dive(graph, oracle, &dive_options, Some(&best), rng) {
                Ok(Some(ds)) => {
                    log::info!("dive found {} nodes", ds.len());
                    best = ds;
                },
                Ok(None) => (),
                Err(e) => log::warn!("dive failed: {}", e),
            }
        }
    }
    Ok(best)
}

impl DSInstance {

    /// Writes a solution to a `Write` type, one id per line in increasing order.
    pub fn write_solution<W: Write>(solution: &FxHashSet<usize>, mut out: W) -> Result<(), io::Error> {
        let mut nodes: Vec<usize> = solution.iter().copied().collect();
        nodes.sort_unstable();
        for elem in nodes {
            writeln!(out, "{}", elem)?;
        }
        Ok(())
    }

}
