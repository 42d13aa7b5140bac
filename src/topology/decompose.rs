//! Stripe and block domain decomposition.
//!
//! Every rank computes its own topology independently from globally known
//! parameters; no communication happens here. All ranks running the same
//! resolver over the same inputs is what makes the partition globally
//! consistent, and the pairwise symmetry of the neighbor links follows from
//! the arithmetic below by construction.

use crate::error::HaloGridError;
use crate::params::{Decomposition, SimParams};
use crate::topology::{LocalTopology, Neighbors, Rank};

/// Resolve this rank's partition of the global grid.
///
/// # Errors
/// - [`HaloGridError::NonSquareProcessCount`] in block mode when
///   `world_size` is not a perfect square
/// - [`HaloGridError::PartitionTooSmall`] when the resulting interior cannot
///   hold the halo demanded by the discretization order
pub fn resolve(
    params: &SimParams,
    world_size: usize,
    rank: Rank,
) -> Result<LocalTopology, HaloGridError> {
    debug_assert!(rank < world_size, "rank {rank} outside world {world_size}");
    let border = params.order().radius();
    match params.decomposition() {
        Decomposition::Stripe => stripe(params.nx(), params.ny(), world_size, rank, border),
        Decomposition::Block => block(params.nx(), params.ny(), world_size, rank, border),
    }
}

/// 1-D decomposition: horizontal bands of `ceil(ny / world)` rows, the last
/// rank absorbing the remainder so the bands sum exactly to `ny`.
fn stripe(
    gnx: usize,
    gny: usize,
    world: usize,
    rank: Rank,
    border: usize,
) -> Result<LocalTopology, HaloGridError> {
    let band = gny.div_ceil(world);
    let (ny, up, down) = if world == 1 {
        (gny, None, None)
    } else if rank == 0 {
        (band, None, Some(1))
    } else if rank == world - 1 {
        let rest = gny
            .checked_sub((world - 1) * band)
            .ok_or(HaloGridError::PartitionTooSmall {
                nx: gnx,
                ny: 0,
                border,
            })?;
        (rest, Some(rank - 1), None)
    } else {
        (band, Some(rank - 1), Some(rank + 1))
    };
    LocalTopology::new(
        gnx,
        ny,
        border,
        Neighbors {
            up,
            down,
            ..Neighbors::default()
        },
    )
}

/// 2-D decomposition over a square `side x side` rank grid in row-major
/// order; the last column/row absorb the remainders.
fn block(
    gnx: usize,
    gny: usize,
    world: usize,
    rank: Rank,
    border: usize,
) -> Result<LocalTopology, HaloGridError> {
    let side = world.isqrt();
    if side * side != world {
        return Err(HaloGridError::NonSquareProcessCount(world));
    }
    let row = rank / side;
    let col = rank % side;
    let bx = gnx.div_ceil(side);
    let by = gny.div_ceil(side);
    let nx = if col + 1 == side {
        gnx.checked_sub((side - 1) * bx)
            .ok_or(HaloGridError::PartitionTooSmall {
                nx: 0,
                ny: gny,
                border,
            })?
    } else {
        bx
    };
    let ny = if row + 1 == side {
        gny.checked_sub((side - 1) * by)
            .ok_or(HaloGridError::PartitionTooSmall {
                nx: gnx,
                ny: 0,
                border,
            })?
    } else {
        by
    };
    let neighbors = Neighbors {
        up: (row > 0).then(|| rank - side),
        down: (row + 1 < side).then(|| rank + side),
        left: (col > 0).then(|| rank - 1),
        right: (col + 1 < side).then(|| rank + 1),
    };
    LocalTopology::new(nx, ny, border, neighbors)
}
