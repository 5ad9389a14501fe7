//! A population of dominating sets that is refined by annealing moves, crossovers through the
//! relaxation and a selection that keeps the best sets and a random part of the next tier.

use std::time::Instant;
use fxhash::FxHashSet;
use rand::Rng;
use rand::seq::IteratorRandom;
use crate::cust_error::ProcessingError;
use crate::events::{self, SearchEvent};
use crate::graph::DyUGraph;
use crate::heuristics::Construction;
use crate::local_search::{level_scale, metropolis_accept, perturb_and_repair, AnnealingOptions, DSAnnealing};
use crate::relaxation::RelaxationOracle;
use crate::rounding::{iterative_rounding, MAX_REFINEMENT_ROUNDS};

/// Configuration of `DSGenetic`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticOptions {
    /// Defaults to `20`.
    pub population_size: usize,
    /// The number of best parents and best children that survive a generation. Defaults to `5`.
    pub elite: usize,
    /// The number of parents and children drawn from the ranks `2 * elite .. population_size`
    /// that survive a generation. Defaults to `5`.
    pub diverse: usize,
    /// Annealing moves applied to every individual per generation. Defaults to `10`.
    pub moves_per_individual: usize,
    /// Defaults to `0.05`.
    pub initial_temperature: f64,
    /// Defaults to `0.01`.
    pub min_temperature: f64,
    /// The temperature is multiplied by this after every generation. Defaults to `0.9`.
    pub cooling_rate: f64,
    /// Acceptance pressure of the moves, as in `AnnealingOptions::alpha`. Defaults to `0.1`.
    pub alpha: f64,
    /// Initial temperature of the annealing runs that seed the population. Defaults to `0.04`.
    pub seed_temperature: f64,
    /// Stop after this many generations without a smaller set. Defaults to `3`.
    pub stall_generations: usize,
    pub deadline: Option<Instant>,
}

impl Default for GeneticOptions {
    fn default() -> Self {
        Self {
            population_size: 20,
            elite: 5,
            diverse: 5,
            moves_per_individual: 10,
            initial_temperature: 0.05,
            min_temperature: 0.01,
            cooling_rate: 0.9,
            alpha: 0.1,
            seed_temperature: 0.04,
            stall_generations: 3,
            deadline: None,
        }
    }
}

impl GeneticOptions {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_selection(mut self, elite: usize, diverse: usize) -> Self {
        self.elite = elite;
        self.diverse = diverse;
        self
    }

    pub fn with_moves_per_individual(mut self, moves: usize) -> Self {
        self.moves_per_individual = moves;
        self
    }

    pub fn with_stall_generations(mut self, generations: usize) -> Self {
        self.stall_generations = generations;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.population_size == 0 {
            return Err(ProcessingError::InvalidParameter("population is empty".to_string()))
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(ProcessingError::InvalidParameter(format!("cooling rate {} is not in (0,1)", self.cooling_rate)))
        }
        if !(self.initial_temperature > 0.0) || !(self.seed_temperature > 0.0) {
            return Err(ProcessingError::InvalidParameter("temperatures must be positive".to_string()))
        }
        if !(self.alpha > 0.0) {
            return Err(ProcessingError::InvalidParameter(format!("alpha {} is not positive", self.alpha)))
        }
        Ok(())
    }

    fn expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Keeps the `elite` smallest sets of `group` and up to `diverse` random sets of the next tier.
fn select<R: Rng>(mut group: Vec<FxHashSet<usize>>, options: &GeneticOptions, rng: &mut R) -> Vec<FxHashSet<usize>> {
    group.sort_by_key(|ds| ds.len());
    let tier_end = options.population_size.min(group.len());
    let tier_start = (2 * options.elite).min(tier_end);
    let mut picked: Vec<usize> = (0..options.elite.min(group.len())).collect();
    picked.extend((tier_start..tier_end).choose_multiple(rng, options.diverse));
    let mut group: Vec<Option<FxHashSet<usize>>> = group.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|i| group[i].take()).collect()
}

pub struct DSGenetic<'a, O: RelaxationOracle + ?Sized> {
    graph: &'a DyUGraph,
    oracle: &'a O,
    population: Vec<FxHashSet<usize>>,
    best: FxHashSet<usize>,
}

impl<'a, O: RelaxationOracle + ?Sized> DSGenetic<'a, O> {

    /// Seeds the population with annealed copies of the rounded relaxation of `graph`. If the
    /// relaxation fails, the greedy construction is annealed instead.
    pub fn new<R: Rng>(graph: &'a DyUGraph, oracle: &'a O, options: &GeneticOptions, rng: &mut R) -> Result<Self, ProcessingError> {
        options.validate()?;
        let seed = match Construction::RelaxationRounding.build(graph, oracle, rng) {
            Ok(ds) => ds,
            Err(ProcessingError::RelaxationInfeasible) => {
                log::warn!("relaxation failed, seeding the population greedily");
                Construction::GreedyLn.build(graph, oracle, rng)?
            },
            Err(e) => return Err(e),
        };
        let annealing_options = AnnealingOptions::default()
            .with_initial_temperature(options.seed_temperature)
            .with_alpha(options.alpha)
            .with_deadline(options.deadline);
        let mut population = Vec::with_capacity(options.population_size);
        for _ in 0..options.population_size {
            let mut annealing = DSAnnealing::new(graph, seed.clone())?;
            population.push(annealing.anneal(&annealing_options, rng, &mut events::ignore)?);
        }
        let best = population.iter()
            .min_by_key(|ds| ds.len())
            .cloned()
            .unwrap_or(seed);
        Ok(DSGenetic {
            graph,
            oracle,
            population,
            best,
        })
    }

    pub fn population(&self) -> &[FxHashSet<usize>] {
        &self.population
    }

    /// The smallest set seen so far.
    pub fn best(&self) -> &FxHashSet<usize> {
        &self.best
    }

    fn record(&mut self, ds: &FxHashSet<usize>) -> bool {
        if ds.len() < self.best.len() {
            self.best = ds.clone();
            return true
        }
        false
    }

    /// Combines `first` and `second`: their common members are fixed to `1`, the relaxation is
    /// solved again and rounded.
    pub fn crossover(&self, first: &FxHashSet<usize>, second: &FxHashSet<usize>) -> Result<FxHashSet<usize>, ProcessingError> {
        let common: FxHashSet<usize> = first.intersection(second).copied().collect();
        let values = self.oracle.solve_fixed(self.graph, &common, &FxHashSet::default())?;
        let (_, mut child) = iterative_rounding(self.oracle, self.graph, &values, &common, MAX_REFINEMENT_ROUNDS);
        self.graph.remove_redundant(&mut child);
        Ok(child)
    }

    /// Applies `moves` single node moves to every individual.
    fn mutate<R: Rng>(&mut self, moves: usize, scale: f64, temp: f64, rng: &mut R) -> Result<(), ProcessingError> {
        for i in 0..self.population.len() {
            for _ in 0..moves {
                if self.population[i].is_empty() {
                    break
                }
                let candidate = perturb_and_repair(self.graph, &self.population[i], 1, rng)?;
                if metropolis_accept(self.population[i].len(), candidate.len(), scale, temp, rng) {
                    self.population[i] = candidate;
                }
            }
            let individual = self.population[i].clone();
            self.record(&individual);
        }
        Ok(())
    }

    /// Runs generations until the temperature falls to `options.min_temperature`, the best set
    /// did not improve for `options.stall_generations` generations or the deadline passes.
    ///
    /// Returns the best set found, stripped of redundant members and checked against the graph.
    pub fn evolve<R: Rng>(
        &mut self,
        options: &GeneticOptions,
        rng: &mut R,
        sink: &mut dyn FnMut(&SearchEvent),
    ) -> Result<FxHashSet<usize>, ProcessingError> {
        options.validate()?;
        let scale = level_scale(self.graph.num_nodes(), options.alpha) as f64;
        let mut temp = options.initial_temperature;
        let mut generation = 0;
        let mut stalled = 0;
        while temp > options.min_temperature {
            if options.expired() {
                log::debug!("population refinement reached its deadline after {} generations", generation);
                break
            }
            self.mutate(options.moves_per_individual, scale, temp, rng)?;

            let mut children = Vec::new();
            for i in 0..self.population.len() {
                for j in i + 1..self.population.len() {
                    match self.crossover(&self.population[i], &self.population[j]) {
                        Ok(child) => children.push(child),
                        Err(e) => log::debug!("crossover of {} and {} skipped: {}", i, j, e),
                    }
                }
            }

            let mut parents = std::mem::take(&mut self.population);
            parents.sort_by_key(|ds| ds.len());
            let mut next = select(parents.clone(), options, rng);
            next.extend(select(children, options, rng));
            next.truncate(options.population_size);
            // too few children survived, refill with the best parents
            let missing = options.population_size.saturating_sub(next.len());
            next.extend(parents.into_iter().take(missing));
            self.population = next;

            temp *= options.cooling_rate;
            generation += 1;
            let current = self.population.iter().min_by_key(|ds| ds.len()).cloned();
            let improved = match current {
                Some(ds) => self.record(&ds),
                None => false,
            };
            if improved {
                stalled = 0;
            } else {
                stalled += 1;
            }
            sink(&SearchEvent::GenerationCompleted { generation, best: self.best.len() });
            log::debug!("generation {}: best {}", generation, self.best.len());
            if stalled >= options.stall_generations {
                break
            }
        }
        let mut result = self.best.clone();
        self.graph.remove_redundant(&mut result);
        self.graph.check_dominating_set(&result)?;
        self.best = result.clone();
        Ok(result)
    }

}
