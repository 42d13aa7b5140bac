//! Process topology: each rank's partition extents and neighbor links.
//!
//! Neighbors are explicit options per direction rather than sentinel ranks;
//! a `None` means the partition touches the domain edge and the boundary
//! condition applies there instead of communication.

pub mod decompose;

use crate::error::HaloGridError;

/// Identifier of a cooperating process.
pub type Rank = usize;

/// One of the four halo-exchange directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward lower y.
    Up,
    /// Toward higher y.
    Down,
    /// Toward lower x.
    Left,
    /// Toward higher x.
    Right,
}

impl Direction {
    /// All four directions, in exchange-initiation order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Right,
        Direction::Left,
    ];

    /// Message tag of the channel a sender uses for this direction.
    ///
    /// At most one message per direction per rank is in flight at a time, so
    /// a tag per direction is all the channel separation the protocol needs.
    pub const fn tag(self) -> u16 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// The direction a matching receiver sees this transfer from.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Neighbor ranks of one partition, one optional link per direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
    /// Rank above, if any.
    pub up: Option<Rank>,
    /// Rank below, if any.
    pub down: Option<Rank>,
    /// Rank to the left, if any.
    pub left: Option<Rank>,
    /// Rank to the right, if any.
    pub right: Option<Rank>,
}

impl Neighbors {
    /// The neighbor in a given direction.
    pub fn get(&self, dir: Direction) -> Option<Rank> {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Number of present neighbors (0-4).
    pub fn count(&self) -> usize {
        Direction::ALL
            .iter()
            .filter(|d| self.get(**d).is_some())
            .count()
    }
}

/// One rank's share of the global grid: interior extents, halo width and
/// neighbor links. Computed once at startup and never mutated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalTopology {
    /// Local interior width (excluding halo).
    pub nx: usize,
    /// Local interior height (excluding halo).
    pub ny: usize,
    /// Halo width in cells.
    pub border: usize,
    /// Neighbor links.
    pub neighbors: Neighbors,
}

impl LocalTopology {
    /// Build a topology, checking that the interior can hold its own halo.
    ///
    /// # Errors
    /// [`HaloGridError::PartitionTooSmall`] unless both interior dimensions
    /// strictly exceed twice the border width.
    pub fn new(
        nx: usize,
        ny: usize,
        border: usize,
        neighbors: Neighbors,
    ) -> Result<Self, HaloGridError> {
        if nx <= 2 * border || ny <= 2 * border {
            return Err(HaloGridError::PartitionTooSmall { nx, ny, border });
        }
        Ok(Self {
            nx,
            ny,
            border,
            neighbors,
        })
    }

    /// Padded width: interior plus halo on both sides.
    pub fn gx(&self) -> usize {
        self.nx + 2 * self.border
    }

    /// Padded height: interior plus halo on both sides.
    pub fn gy(&self) -> usize {
        self.ny + 2 * self.border
    }
}
