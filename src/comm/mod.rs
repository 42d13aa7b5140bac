//! Thin façade over in-process (mailbox) or inter-process (MPI) message
//! passing.
//!
//! Messages are contiguous byte slices. All handles are waitable but
//! non-blocking: the halo exchange posts its transfers, goes on computing,
//! and calls `.wait()` only when it is about to trust the buffer contents.
//!
//! A recv handle resolves to `Some(bytes)` when the transport delivers the
//! payload out of band (the mailbox backend), or `None` when it has already
//! written directly into the posted buffer (the MPI backend). Send handles
//! always resolve to `None`.

#[cfg(feature = "mpi-support")]
pub mod mpi;

use std::collections::VecDeque;
use std::thread;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::topology::Rank;

#[cfg(feature = "mpi-support")]
pub use self::mpi::MpiComm;

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This process's rank in the group.
    fn rank(&self) -> Rank;

    /// Total number of ranks in the group.
    fn size(&self) -> usize;

    /// Post a non-blocking send of `buf` to `peer` on channel `tag`.
    ///
    /// The caller must keep `buf` alive and untouched until the returned
    /// handle is waited on; the halo exchange guarantees this by owning its
    /// edge buffers for the full iteration.
    fn isend(&self, peer: Rank, tag: u16, buf: &[u8]) -> Self::SendHandle;

    /// Post a non-blocking receive from `peer` on channel `tag` into `buf`.
    ///
    /// Same buffer-lifetime contract as [`Communicator::isend`].
    fn irecv(&self, peer: Rank, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on. Blocks indefinitely; the protocol has no
/// timeout or cancellation path.
pub trait Wait {
    /// Wait for completion and return the received data, if the transport
    /// delivers it out of band.
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for single-rank runs and serial unit tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> Rank {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: Rank, _tag: u16, _buf: &[u8]) -> Self::SendHandle {}

    fn irecv(&self, _peer: Rank, _tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {}
}

// --- MemComm: in-process mailbox, one instance per simulated rank ---

type Key = (Rank, Rank, u16); // (src, dst, tag)

/// Per-channel FIFO queues. A channel carries at most one halo message at a
/// time during a run, but the queue keeps reordered test traffic honest.
static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);

/// In-process mailbox communicator. Ranks live on threads of one process and
/// exchange copies through a shared map; used by the multi-rank tests and by
/// single-host demo runs.
#[derive(Clone, Debug)]
pub struct MemComm {
    rank: Rank,
    size: usize,
}

impl MemComm {
    /// A communicator endpoint for `rank` out of `size`.
    pub fn new(rank: Rank, size: usize) -> Self {
        debug_assert!(rank < size);
        Self { rank, size }
    }
}

/// Pending receive against the shared mailbox. `wait` spins until the
/// matching send lands.
pub struct MailboxRecv {
    key: Key,
    expected: usize,
}

impl Wait for MailboxRecv {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(mut queue) = MAILBOX.get_mut(&self.key) {
                if let Some(msg) = queue.pop_front() {
                    let take = msg.len().min(self.expected);
                    return Some(msg[..take].to_vec());
                }
            }
            thread::yield_now();
        }
    }
}

impl Communicator for MemComm {
    type SendHandle = ();
    type RecvHandle = MailboxRecv;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: Rank, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: Rank, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        MailboxRecv {
            key: (peer, self.rank, tag),
            expected: buf.len(),
        }
    }
}
