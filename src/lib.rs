//! # halo-grid
//!
//! halo-grid solves the 2-D heat-diffusion equation with an explicit
//! finite-difference stencil, parallelized across cooperating ranks by
//! domain decomposition and per-iteration halo exchange. The crate is built
//! around the decomposition-and-communication engine: how the global grid is
//! partitioned (1-D stripes or 2-D blocks), how each rank discovers its
//! neighbors, and how boundary layers move between them through non-blocking
//! point-to-point transfers with explicit completion tracking.
//!
//! ## Features
//! - Stripe and block decomposition with deterministic, communication-free
//!   neighbor resolution
//! - Double-buffered halo-padded sub-grids with 2nd/4th/8th-order stencils
//! - Synchronous and overlapped (communication/computation) iteration
//!   drivers over the same non-blocking exchange primitive
//! - Pluggable transports: serial no-op, in-process mailbox, MPI
//!   (`mpi-support` feature)
//!
//! ## Determinism
//!
//! For a fixed parameter set the result is independent of the rank count and
//! of the scheduling discipline: decomposition moves ownership around but
//! never changes the arithmetic. The equivalence tests in `tests/` pin this.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! halo-grid = "0.1"
//! # Optional: mpi-support
//! ```

pub mod comm;
pub mod driver;
pub mod error;
pub mod grid;
pub mod params;
pub mod snapshot;
pub mod stencil;
pub mod topology;
pub mod wire;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::comm::{Communicator, MemComm, NoComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::driver::{run, step_overlapped, step_sync};
    pub use crate::error::HaloGridError;
    pub use crate::grid::DistributedGrid;
    pub use crate::grid::storage::{Generation, GridStorage};
    pub use crate::params::{
        BoundaryValues, Decomposition, Order, Scheduling, SimParams, SimSpec,
    };
    pub use crate::snapshot::{FileSink, MemorySink, SnapshotSink};
    pub use crate::topology::decompose::resolve;
    pub use crate::topology::{Direction, LocalTopology, Neighbors, Rank};
}
