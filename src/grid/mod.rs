//! The distributed grid: one rank's double-buffered, halo-padded share of
//! the global domain, plus the halo-exchange protocol against its neighbors.

pub mod exchange;
pub mod storage;

use std::fmt;
use std::mem::size_of;

use crate::comm::Communicator;
use crate::error::HaloGridError;
use crate::grid::exchange::PendingExchange;
use crate::grid::storage::{Generation, GridStorage};
use crate::params::{BoundaryValues, SimParams};
use crate::snapshot::{FileSink, SnapshotSink};
use crate::topology::{Direction, LocalTopology, Rank};
use crate::wire;

/// One rank's sub-grid with halo padding, double buffering and the edge
/// buffers and request bookkeeping of the exchange protocol.
///
/// Halo cells on a domain edge (no neighbor) are stamped with the boundary
/// condition at construction and never touched again. Halo cells on a
/// neighbor-bearing edge hold that neighbor's data for the *previous*
/// generation only; the current generation's halo is stale until the next
/// exchange round.
pub struct DistributedGrid<C: Communicator> {
    comm: C,
    topo: LocalTopology,
    storage: GridStorage,
    current: Generation,
    send_left: Vec<f64>,
    send_right: Vec<f64>,
    recv_left: Vec<f64>,
    recv_right: Vec<f64>,
    pending: Option<PendingExchange<C>>,
}

impl<C: Communicator> DistributedGrid<C> {
    /// Allocate the double-buffered storage, stamp the initial condition and
    /// the boundary layers, and set up edge buffers for the horizontal
    /// neighbors that exist.
    ///
    /// Boundary stamping order is top, bottom, right, left; a corner cell
    /// where two domain edges meet keeps whichever stamp lands last.
    ///
    /// # Errors
    /// [`HaloGridError::PartitionTooSmall`] if the topology cannot hold its
    /// own halo.
    pub fn new(comm: C, topo: LocalTopology, params: &SimParams) -> Result<Self, HaloGridError> {
        if topo.nx <= 2 * topo.border || topo.ny <= 2 * topo.border {
            return Err(HaloGridError::PartitionTooSmall {
                nx: topo.nx,
                ny: topo.ny,
                border: topo.border,
            });
        }
        let gx = topo.gx();
        let gy = topo.gy();
        let mut storage = GridStorage::new(gx, gy, params.ic());
        for generation in [Generation::A, Generation::B] {
            stamp_boundaries(&mut storage, generation, &topo, params.bc());
        }

        let edge_len = gy * topo.border;
        let horizontal = |present: bool| {
            if present {
                (vec![0.0; edge_len], vec![0.0; edge_len])
            } else {
                (Vec::new(), Vec::new())
            }
        };
        let (send_left, recv_left) = horizontal(topo.neighbors.left.is_some());
        let (send_right, recv_right) = horizontal(topo.neighbors.right.is_some());

        log::debug!(
            "rank {}: local ({}, {}) padded ({}, {}) neighbors {:?}",
            comm.rank(),
            topo.nx,
            topo.ny,
            gx,
            gy,
            topo.neighbors,
        );

        Ok(Self {
            comm,
            topo,
            storage,
            current: Generation::B,
            send_left,
            send_right,
            recv_left,
            recv_right,
            pending: None,
        })
    }

    /// This rank's identifier.
    pub fn rank(&self) -> Rank {
        self.comm.rank()
    }

    /// The topology this grid was built from.
    pub fn topology(&self) -> &LocalTopology {
        &self.topo
    }

    /// The generation the stencil writes this iteration.
    pub fn current(&self) -> Generation {
        self.current
    }

    /// The generation the stencil reads this iteration.
    pub fn previous(&self) -> Generation {
        self.current.flip()
    }

    /// Flip which buffer is current. O(1), no data movement.
    pub fn swap_generation(&mut self) {
        self.current = self.current.flip();
    }

    /// Read-only cell storage.
    pub fn storage(&self) -> &GridStorage {
        &self.storage
    }

    /// Read one cell. Hot path.
    #[inline]
    pub fn at(&self, generation: Generation, x: usize, y: usize) -> f64 {
        self.storage.at(generation, x, y)
    }

    /// Write one cell. Hot path.
    #[inline]
    pub fn set(&mut self, generation: Generation, x: usize, y: usize, value: f64) {
        self.storage.set(generation, x, y, value);
    }

    /// Post non-blocking sends of the outward-facing border layers of the
    /// previous generation, and matching receives, for every direction with
    /// a neighbor. Returns immediately.
    ///
    /// Vertical transfers move contiguous row blocks in place; horizontal
    /// transfers go through the packed edge buffers because a column is not
    /// addressable as one contiguous run.
    pub fn begin_halo_exchange(&mut self) -> Result<(), HaloGridError> {
        debug_assert!(
            self.pending.is_none(),
            "previous exchange round still outstanding"
        );
        let prev = self.previous();
        let b = self.topo.border;
        let gx = self.topo.gx();
        let gy = self.topo.gy();
        let row_block_bytes = gx * b * size_of::<f64>();
        let col_block_bytes = gy * b * size_of::<f64>();
        let mut pending = PendingExchange::with_capacity(self.topo.neighbors.count());

        if let Some(nbr) = self.topo.neighbors.up {
            let outgoing = wire::cast_slice(self.storage.rows(prev, b, b));
            pending.push_send(nbr, self.comm.isend(nbr, Direction::Up.tag(), outgoing));
            let target = wire::cast_slice_mut(self.storage.rows_mut(prev, 0, b));
            let handle = self.comm.irecv(nbr, Direction::Up.opposite().tag(), target);
            pending.push_recv(Direction::Up, nbr, row_block_bytes, handle);
        }
        if let Some(nbr) = self.topo.neighbors.down {
            let outgoing = wire::cast_slice(self.storage.rows(prev, gy - 2 * b, b));
            pending.push_send(nbr, self.comm.isend(nbr, Direction::Down.tag(), outgoing));
            let target = wire::cast_slice_mut(self.storage.rows_mut(prev, gy - b, b));
            let handle = self.comm.irecv(nbr, Direction::Down.opposite().tag(), target);
            pending.push_recv(Direction::Down, nbr, row_block_bytes, handle);
        }

        if self.topo.neighbors.left.is_some() || self.topo.neighbors.right.is_some() {
            self.pack_edge_columns(prev);
        }
        if let Some(nbr) = self.topo.neighbors.right {
            let outgoing = wire::cast_slice(&self.send_right);
            pending.push_send(nbr, self.comm.isend(nbr, Direction::Right.tag(), outgoing));
            let target = wire::cast_slice_mut(&mut self.recv_right);
            let handle = self.comm.irecv(nbr, Direction::Right.opposite().tag(), target);
            pending.push_recv(Direction::Right, nbr, col_block_bytes, handle);
        }
        if let Some(nbr) = self.topo.neighbors.left {
            let outgoing = wire::cast_slice(&self.send_left);
            pending.push_send(nbr, self.comm.isend(nbr, Direction::Left.tag(), outgoing));
            let target = wire::cast_slice_mut(&mut self.recv_left);
            let handle = self.comm.irecv(nbr, Direction::Left.opposite().tag(), target);
            pending.push_recv(Direction::Left, nbr, col_block_bytes, handle);
        }

        self.pending = Some(pending);
        Ok(())
    }

    /// Block until all sends of the most recent exchange round finish.
    pub fn wait_sends(&mut self) -> Result<(), HaloGridError> {
        if let Some(pending) = self.pending.as_mut() {
            pending.wait_sends()?;
            if pending.is_drained() {
                self.pending = None;
            }
        }
        Ok(())
    }

    /// Block until all receives of the most recent exchange round finish,
    /// then place every payload: vertical rows into the halo rows of the
    /// previous generation, horizontal columns unpacked from the edge
    /// buffers into the halo columns.
    pub fn wait_recvs(&mut self) -> Result<(), HaloGridError> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        if pending.outstanding_recvs() == 0 {
            return Ok(());
        }
        let deliveries = pending.wait_recvs()?;
        if pending.is_drained() {
            self.pending = None;
        }

        let prev = self.previous();
        let b = self.topo.border;
        let gy = self.topo.gy();
        for delivery in deliveries {
            let Some(data) = delivery.payload else {
                continue; // transport wrote in place
            };
            let cells: Vec<f64> = wire::collect_scalars(&data);
            match delivery.dir {
                Direction::Up => self.storage.rows_mut(prev, 0, b).copy_from_slice(&cells),
                Direction::Down => self
                    .storage
                    .rows_mut(prev, gy - b, b)
                    .copy_from_slice(&cells),
                Direction::Left => self.recv_left.copy_from_slice(&cells),
                Direction::Right => self.recv_right.copy_from_slice(&cells),
            }
        }
        self.unpack_halo_columns(prev);
        Ok(())
    }

    /// Serialize the current generation, halo included, through a sink.
    /// Highest-index row first; read-only.
    pub fn snapshot<S: SnapshotSink>(&self, sink: &mut S) -> Result<(), HaloGridError> {
        for y in (0..self.topo.gy()).rev() {
            sink.write_row(self.storage.row(self.current, y))?;
        }
        sink.finish()
    }

    /// Write a `grid{rank}_{identifier}.txt` snapshot in the working
    /// directory, as one file per rank.
    pub fn save_to_file(&self, identifier: &str) -> Result<(), HaloGridError> {
        let mut sink = FileSink::create(".", self.rank(), identifier)?;
        self.snapshot(&mut sink)
    }

    /// The interior of the current generation with the halo stripped, one
    /// `Vec` per row in ascending y. Used to reassemble a global grid from
    /// per-rank pieces.
    pub fn interior_rows(&self) -> Vec<Vec<f64>> {
        let b = self.topo.border;
        (b..b + self.topo.ny)
            .map(|y| self.storage.row(self.current, y)[b..b + self.topo.nx].to_vec())
            .collect()
    }

    /// Linearize the outward-facing interior columns into the send buffers.
    /// Runs over the full padded height so corner halo rows travel too.
    fn pack_edge_columns(&mut self, prev: Generation) {
        let b = self.topo.border;
        let gy = self.topo.gy();
        let nx = self.topo.nx;
        let left = self.topo.neighbors.left.is_some();
        let right = self.topo.neighbors.right.is_some();
        for i in 0..gy {
            for j in 0..b {
                if left {
                    self.send_left[i * b + j] = self.storage.at(prev, b + j, i);
                }
                if right {
                    self.send_right[i * b + j] = self.storage.at(prev, nx + j, i);
                }
            }
        }
    }

    /// Scatter received horizontal payloads from the edge buffers into the
    /// halo columns of the previous generation.
    fn unpack_halo_columns(&mut self, prev: Generation) {
        let b = self.topo.border;
        let gy = self.topo.gy();
        let nx = self.topo.nx;
        let left = self.topo.neighbors.left.is_some();
        let right = self.topo.neighbors.right.is_some();
        if !left && !right {
            return;
        }
        for i in 0..gy {
            for j in 0..b {
                if left {
                    self.storage.set(prev, j, i, self.recv_left[i * b + j]);
                }
                if right {
                    self.storage.set(prev, nx + b + j, i, self.recv_right[i * b + j]);
                }
            }
        }
    }
}

impl<C: Communicator> fmt::Display for DistributedGrid<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.topo.gy()).rev() {
            for x in 0..self.topo.gx() {
                write!(f, "{:5.3} ", self.storage.at(self.current, x, y))?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}

/// Overwrite the outward-facing border layers on edges with no neighbor.
/// Stamp order is top, bottom, right, left; the last stamp wins at corners.
fn stamp_boundaries(
    storage: &mut GridStorage,
    generation: Generation,
    topo: &LocalTopology,
    bc: BoundaryValues,
) {
    let b = topo.border;
    let gx = topo.gx();
    let gy = topo.gy();
    if topo.neighbors.up.is_none() {
        for j in 0..b {
            for x in 0..gx {
                storage.set(generation, x, j, bc.top);
            }
        }
    }
    if topo.neighbors.down.is_none() {
        for j in 0..b {
            for x in 0..gx {
                storage.set(generation, x, gy - 1 - j, bc.bottom);
            }
        }
    }
    if topo.neighbors.right.is_none() {
        for y in 0..gy {
            for j in 0..b {
                storage.set(generation, gx - 1 - j, y, bc.right);
            }
        }
    }
    if topo.neighbors.left.is_none() {
        for y in 0..gy {
            for j in 0..b {
                storage.set(generation, j, y, bc.left);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::params::{SimParams, SimSpec};
    use crate::topology::decompose;

    fn params_for_order(order: u32) -> SimParams {
        SimParams::new(&SimSpec {
            nx: 12,
            ny: 12,
            order,
            ..SimSpec::default()
        })
        .unwrap()
    }

    fn lone_grid(order: u32) -> DistributedGrid<NoComm> {
        let params = params_for_order(order);
        let topo = decompose::resolve(&params, 1, 0).unwrap();
        DistributedGrid::new(NoComm, topo, &params).unwrap()
    }

    #[test]
    fn boundary_layers_hold_their_values_for_every_border_width() {
        for order in [2u32, 4, 8] {
            let grid = lone_grid(order);
            let t = *grid.topology();
            let (b, gx, gy) = (t.border, t.gx(), t.gy());
            for generation in [Generation::A, Generation::B] {
                // interior stays at the initial condition
                assert_eq!(grid.at(generation, gx / 2, gy / 2), 5.0, "order {order}");
                // top/bottom rows away from the side columns
                for j in 0..b {
                    for x in b..gx - b {
                        assert_eq!(grid.at(generation, x, j), 0.0);
                        assert_eq!(grid.at(generation, x, gy - 1 - j), 0.0);
                    }
                }
                // side columns over the full height
                for y in 0..gy {
                    for j in 0..b {
                        assert_eq!(grid.at(generation, j, y), 10.0);
                        assert_eq!(grid.at(generation, gx - 1 - j, y), 10.0);
                    }
                }
            }
        }
    }

    #[test]
    fn corners_keep_the_last_stamp() {
        // stamp order top, bottom, right, left: both side stamps run after
        // the vertical ones, so every corner block holds a side value
        let grid = lone_grid(4);
        let t = *grid.topology();
        let (gx, gy) = (t.gx(), t.gy());
        assert_eq!(grid.at(grid.current(), 0, 0), 10.0);
        assert_eq!(grid.at(grid.current(), gx - 1, 0), 10.0);
        assert_eq!(grid.at(grid.current(), 0, gy - 1), 10.0);
        assert_eq!(grid.at(grid.current(), gx - 1, gy - 1), 10.0);
    }

    #[test]
    fn generation_starts_at_b_and_flips() {
        let mut grid = lone_grid(2);
        assert_eq!(grid.current(), Generation::B);
        assert_eq!(grid.previous(), Generation::A);
        grid.swap_generation();
        assert_eq!(grid.current(), Generation::A);
        assert_eq!(grid.previous(), Generation::B);
    }

    #[test]
    fn lone_rank_allocates_no_edge_buffers() {
        let grid = lone_grid(2);
        assert!(grid.send_left.is_empty());
        assert!(grid.send_right.is_empty());
        assert!(grid.recv_left.is_empty());
        assert!(grid.recv_right.is_empty());
    }

    #[test]
    fn lone_rank_exchange_round_is_empty_and_harmless() {
        let mut grid = lone_grid(2);
        grid.swap_generation();
        grid.begin_halo_exchange().unwrap();
        grid.wait_sends().unwrap();
        grid.wait_recvs().unwrap();
        // nothing moved; both generations still IC + boundary
        let t = *grid.topology();
        assert_eq!(grid.at(grid.previous(), t.gx() / 2, t.gy() / 2), 5.0);
    }

    #[test]
    fn too_small_partition_is_rejected_at_construction() {
        use crate::topology::{LocalTopology, Neighbors};
        let params = params_for_order(8);
        // bypass the resolver's check to exercise the constructor's own
        let topo = LocalTopology {
            nx: 6,
            ny: 6,
            border: 4,
            neighbors: Neighbors::default(),
        };
        assert!(matches!(
            DistributedGrid::new(NoComm, topo, &params),
            Err(HaloGridError::PartitionTooSmall { .. })
        ));
    }

    #[test]
    fn interior_rows_strip_the_halo() {
        let grid = lone_grid(2);
        let rows = grid.interior_rows();
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.len() == 12));
        assert!(rows[5].iter().all(|&v| v == 5.0));
    }

    #[test]
    fn display_renders_fixed_width_rows() {
        let grid = lone_grid(2);
        let text = format!("{grid}");
        let lines: Vec<&str> = text.lines().collect();
        // gy rows plus the trailing blank line
        assert_eq!(lines.len(), grid.topology().gy() + 1);
        assert!(lines[0].starts_with("10.000"));
        assert!(lines[0].contains("0.000"));
    }
}
