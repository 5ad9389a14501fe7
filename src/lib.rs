pub mod graph;
pub mod cust_error;
pub mod feasibility;
pub mod relaxation;
pub mod rounding;
pub mod heuristics;
pub mod kernelization;
pub mod local_search;
pub mod genetic;
pub mod bounded_search;
pub mod ds_instance;
pub mod events;
