//! Host binary: load a parameter file, run the simulation, dump snapshots.
//!
//! This is the only place that terminates the process; every library-level
//! failure propagates here as a `HaloGridError`. Serial builds run a single
//! rank over the no-op transport; `mpi-support` builds join the MPI world
//! and take their rank from it.

use std::process::ExitCode;
use std::time::Duration;

use halo_grid::comm::Communicator;
#[cfg(not(feature = "mpi-support"))]
use halo_grid::comm::NoComm;
#[cfg(feature = "mpi-support")]
use halo_grid::comm::MpiComm;
use halo_grid::driver;
use halo_grid::error::HaloGridError;
use halo_grid::grid::DistributedGrid;
use halo_grid::params::SimParams;
use halo_grid::topology::decompose;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("heat2d: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), HaloGridError> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| HaloGridError::Config("usage: heat2d <parameter-file>".into()))?;
    let params = SimParams::from_file(&path)?;

    #[cfg(feature = "mpi-support")]
    let comm = MpiComm::new()
        .ok_or_else(|| HaloGridError::Config("MPI is already initialized".into()))?;
    #[cfg(not(feature = "mpi-support"))]
    let comm = NoComm;

    simulate(comm, &params)
}

fn simulate<C: Communicator>(comm: C, params: &SimParams) -> Result<(), HaloGridError> {
    if comm.rank() == 0 {
        params.log_summary();
    }
    let topo = decompose::resolve(params, comm.size(), comm.rank())?;
    let mut grid = DistributedGrid::new(comm, topo, params)?;

    // initial state, useful for checking setup and boundary stamping
    grid.save_to_file("init")?;

    let elapsed: Duration = driver::run(&mut grid, params)?;
    if grid.rank() == 0 {
        println!(
            "{} iterations on a {} by {} grid took: {:.6} seconds.",
            params.iters(),
            params.nx(),
            params.ny(),
            elapsed.as_secs_f64(),
        );
    }

    grid.save_to_file("final")
}
