//! Per-timestep control loop: swap, exchange, interior pass, edge pass.
//!
//! Both scheduling variants run the same per-step contract; they differ only
//! in where the completion waits land relative to the interior pass. The
//! edge pass covers the top and bottom strips first (full interior width),
//! then the left and right strips restricted to the rows strictly between
//! them, so every corner block is written exactly once, by the
//! top/bottom pass.

use std::time::{Duration, Instant};

use crate::comm::Communicator;
use crate::error::HaloGridError;
use crate::grid::DistributedGrid;
use crate::params::{Scheduling, SimParams};
use crate::stencil;

/// One synchronous step: all communication completes before any cell is
/// touched.
pub fn step_sync<C: Communicator>(
    grid: &mut DistributedGrid<C>,
    params: &SimParams,
) -> Result<(), HaloGridError> {
    grid.swap_generation();
    grid.begin_halo_exchange()?;
    grid.wait_sends()?;
    grid.wait_recvs()?;
    apply_interior(grid, params);
    apply_edges(grid, params);
    Ok(())
}

/// One overlapped step: the interior pass runs while transfers are in
/// flight; only the edge pass waits for them.
///
/// The interior cells sit at least `2 * border` away from every local edge,
/// so they depend only on already-resident data, never on the halo.
pub fn step_overlapped<C: Communicator>(
    grid: &mut DistributedGrid<C>,
    params: &SimParams,
) -> Result<(), HaloGridError> {
    grid.swap_generation();
    grid.begin_halo_exchange()?;
    apply_interior(grid, params);
    grid.wait_sends()?;
    grid.wait_recvs()?;
    apply_edges(grid, params);
    Ok(())
}

/// Run the configured number of iterations under the configured scheduling
/// discipline and return the elapsed wall time. Rank 0 logs a summary.
pub fn run<C: Communicator>(
    grid: &mut DistributedGrid<C>,
    params: &SimParams,
) -> Result<Duration, HaloGridError> {
    let start = Instant::now();
    for _ in 0..params.iters() {
        match params.scheduling() {
            Scheduling::Synchronous => step_sync(grid, params)?,
            Scheduling::Overlapped => step_overlapped(grid, params)?,
        }
    }
    let elapsed = start.elapsed();
    if grid.rank() == 0 {
        log::info!(
            "{} iterations on a {} by {} grid took {:.6} s",
            params.iters(),
            params.nx(),
            params.ny(),
            elapsed.as_secs_f64(),
        );
    }
    Ok(elapsed)
}

/// Stencil over the deep interior: cells at least `2 * border` from every
/// local edge, in storage coordinates `[2b, n)` on both axes.
fn apply_interior<C: Communicator>(grid: &mut DistributedGrid<C>, params: &SimParams) {
    let f = stencil::for_order(params.order());
    let (xcfl, ycfl) = (params.xcfl(), params.ycfl());
    let t = *grid.topology();
    let b = t.border;
    let (curr, prev) = (grid.current(), grid.previous());
    for y in 2 * b..t.ny {
        for x in 2 * b..t.nx {
            let v = f(grid.storage(), prev, x, y, xcfl, ycfl);
            grid.set(curr, x, y, v);
        }
    }
}

/// Stencil over the edge strips, which read freshly received halo data:
/// top and bottom rows over the full interior width, then left and right
/// columns over the remaining rows.
fn apply_edges<C: Communicator>(grid: &mut DistributedGrid<C>, params: &SimParams) {
    let f = stencil::for_order(params.order());
    let (xcfl, ycfl) = (params.xcfl(), params.ycfl());
    let t = *grid.topology();
    let b = t.border;
    let (curr, prev) = (grid.current(), grid.previous());
    for y in 0..b {
        let y_top = y + b;
        let y_bottom = y + t.ny;
        for x in b..t.nx + b {
            let v = f(grid.storage(), prev, x, y_top, xcfl, ycfl);
            grid.set(curr, x, y_top, v);
            let v = f(grid.storage(), prev, x, y_bottom, xcfl, ycfl);
            grid.set(curr, x, y_bottom, v);
        }
    }
    for y in 2 * b..t.ny {
        for x in 0..b {
            let x_left = x + b;
            let x_right = x + t.nx;
            let v = f(grid.storage(), prev, x_left, y, xcfl, ycfl);
            grid.set(curr, x_left, y, v);
            let v = f(grid.storage(), prev, x_right, y, xcfl, ycfl);
            grid.set(curr, x_right, y, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::grid::DistributedGrid;
    use crate::params::{SimParams, SimSpec};
    use crate::topology::decompose;

    fn lone_grid(spec: &SimSpec) -> (DistributedGrid<NoComm>, SimParams) {
        let params = SimParams::new(spec).unwrap();
        let topo = decompose::resolve(&params, 1, 0).unwrap();
        (DistributedGrid::new(NoComm, topo, &params).unwrap(), params)
    }

    #[test]
    fn zero_iterations_leave_the_initial_state() {
        let (mut grid, params) = lone_grid(&SimSpec {
            iters: 0,
            ..SimSpec::default()
        });
        let before = grid.interior_rows();
        run(&mut grid, &params).unwrap();
        assert_eq!(grid.interior_rows(), before);
    }

    #[test]
    fn heat_flows_in_from_hot_side_walls() {
        // ic 5 with side walls at 10 and top/bottom at 0: after one step the
        // cells next to a wall move toward that wall's value
        let (mut grid, params) = lone_grid(&SimSpec {
            iters: 1,
            ..SimSpec::default()
        });
        run(&mut grid, &params).unwrap();
        let rows = grid.interior_rows();
        let mid = rows.len() / 2;
        assert!(rows[mid][0] > 5.0, "left column warms: {}", rows[mid][0]);
        assert!(
            rows[mid].last().unwrap() > &5.0,
            "right column warms: {:?}",
            rows[mid].last()
        );
        assert!(rows[0][5] < 5.0, "top row cools: {}", rows[0][5]);
        assert!(
            rows.last().unwrap()[5] < 5.0,
            "bottom row cools: {:?}",
            rows.last().unwrap()[5]
        );
        // the deep interior has not felt the walls after a single step
        assert_eq!(rows[mid][5], 5.0);
    }

    #[test]
    fn every_interior_cell_is_written_each_step() {
        // one step from a state where the write generation is poisoned:
        // any missed cell would keep the poison value
        let (mut grid, params) = lone_grid(&SimSpec {
            nx: 11,
            ny: 13,
            iters: 0,
            ..SimSpec::default()
        });
        let t = *grid.topology();
        let poison = f64::NAN;
        let target = grid.previous(); // becomes current after the swap
        for y in t.border..t.border + t.ny {
            for x in t.border..t.border + t.nx {
                grid.set(target, x, y, poison);
            }
        }
        step_sync(&mut grid, &params).unwrap();
        for row in grid.interior_rows() {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn orders_four_and_eight_step_without_touching_missing_halo() {
        for order in [4u32, 8] {
            let (mut grid, params) = lone_grid(&SimSpec {
                nx: 16,
                ny: 16,
                order,
                iters: 3,
                ..SimSpec::default()
            });
            run(&mut grid, &params).unwrap();
            assert!(
                grid.interior_rows()
                    .iter()
                    .flatten()
                    .all(|v| v.is_finite())
            );
        }
    }
}
