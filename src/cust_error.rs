//! This module contains all custom errors used in this library.

use std::fmt;
use std::error::Error;

#[derive(Debug)]
pub enum ImportError {
    IoError(std::io::Error),
    InputMalformedError,
    BadIntError(std::num::ParseIntError),
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> ImportError {
        ImportError::IoError(e)
    }
}

impl From<std::num::ParseIntError> for ImportError {
    fn from(e: std::num::ParseIntError) -> ImportError {
        ImportError::BadIntError(e)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(_) => write!(f, "Import: IoError"),
            Self::InputMalformedError => write!(f, "Import: Input is malformed."),
            Self::BadIntError(_) => write!(f, "Import: Integer is malformed."),
        }
    }
}

impl Error for ImportError {}

#[derive(Debug, PartialEq)]
pub enum ProcessingError {
    /// The relaxation oracle did not report an optimal assignment. The caller has to fall back to
    /// a construction heuristic that does not need the relaxation.
    RelaxationInfeasible,
    /// A set reported as final does not dominate the graph.
    NotDominatingSet(String),
    /// A vertex without neighbors was asked for a neighbor.
    EmptyNeighborhood(usize),
    /// The wall-clock budget ran out before any feasible set was known.
    Timeout,
    InvalidParameter(String),
    GraphError(String),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelaxationInfeasible => write!(f, "Relaxation: no optimal assignment"),
            Self::NotDominatingSet(msg) => write!(f, "Not a dominating set: {}", msg),
            Self::EmptyNeighborhood(node) => write!(f, "Node {} has no neighbors", node),
            Self::Timeout => write!(f, "Timeout before a feasible set was found"),
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::GraphError(msg) => write!(f, "Graph error: {}", msg),
        }
    }
}

impl Error for ProcessingError {}
