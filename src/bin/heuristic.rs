//! Binary that takes as standart in a graph in .gr format, computes a small dominating set and
//! writes the solution to standart out. An optional first argument seeds the random number
//! generator, an optional second one is the timeout in seconds.

use std::env;
use std::error;
use std::io;

use rand::rngs::StdRng;
use rand::SeedableRng;
use duck_and_dominate::{
    cust_error::ProcessingError,
    ds_instance::{DSInstance, SolverOptions},
    events,
    graph::DyUGraph,
    relaxation::SimplexOracle,
};

pub fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let seed = match args.next() {
        Some(seed) => seed.parse::<u64>()?,
        None => 0,
    };
    let timeout = match args.next() {
        Some(secs) => Some(secs.parse::<u64>()?),
        None => None,
    };
    let stdin = io::stdin();
    let stdin = stdin.lock();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let graph = DyUGraph::read_gr(stdin)?;
    let mut dsi = DSInstance::new(graph);
    let org = dsi.clone();
    let mut rng = StdRng::seed_from_u64(seed);
    let options = SolverOptions::default().with_timeout(timeout);
    let resu = dsi.solve(&options, &SimplexOracle, &mut rng, &mut events::ignore)?;

    // Validate
    if !org.validate_solution(&resu) {
        return Err(Box::new(ProcessingError::NotDominatingSet("final set".to_owned())));
    }

    DSInstance::write_solution(&resu, &mut stdout)?;
    Ok(())
}
