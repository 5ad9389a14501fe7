//! Progress events emitted by the stochastic parts of the pipeline.

use crate::heuristics::Construction;

/// A structured progress report. Consumers receive these through a `&mut dyn FnMut(&SearchEvent)`
/// sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// The kernelizer reached a fixpoint or ran out of passes.
    Kernelized { before: usize, after: usize },
    /// A construction heuristic produced an initial dominating set.
    Constructed { construction: Construction, size: usize },
    /// The annealing finished a temperature level.
    LevelCompleted { level: usize, temperature: f64, size: usize, best: usize },
    /// The population refiner finished a generation.
    GenerationCompleted { generation: usize, best: usize },
    /// The pipeline validated its final set.
    Finished { size: usize },
}

/// A sink that drops every event.
pub fn ignore(_: &SearchEvent) {}
