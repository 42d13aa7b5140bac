//! HaloGridError: unified error type for halo-grid public APIs.
//!
//! Every failure mode of the solver maps to one of these variants: bad
//! configuration, a topology precondition violated at construction, or a
//! failed transfer. There is no recoverable-error path; callers are expected
//! to propagate these to a top-level run loop that decides termination.

use thiserror::Error;

/// Unified error type for halo-grid operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HaloGridError {
    /// Malformed or incomplete parameter input.
    #[error("malformed parameter input: {0}")]
    Config(String),
    /// Discretization order other than 2, 4 or 8.
    #[error("unsupported discretization order {0} (expected 2, 4 or 8)")]
    UnsupportedOrder(u32),
    /// Decomposition mode other than 1 (stripe) or 2 (block).
    #[error("unsupported decomposition mode {0} (expected 1 = stripe, 2 = block)")]
    UnsupportedDecomposition(i64),
    /// Block decomposition over a process count that is not a perfect square.
    #[error("block decomposition requires a square process count, got {0}")]
    NonSquareProcessCount(usize),
    /// Local partition too small to hold its own halo.
    #[error("local partition {nx}x{ny} cannot hold a border of {border} cells")]
    PartitionTooSmall {
        /// Local interior width.
        nx: usize,
        /// Local interior height.
        ny: usize,
        /// Halo width demanded by the discretization order.
        border: usize,
    },
    /// A send, receive or wait against a neighbor failed.
    #[error("communication with rank {neighbor} failed: {reason}")]
    Comm {
        /// Rank of the peer the transfer was addressed to.
        neighbor: usize,
        /// Transport-level description of the failure.
        reason: String,
    },
    /// Writing a grid snapshot to its sink failed.
    #[error("snapshot I/O failed: {0}")]
    Snapshot(String),
}
