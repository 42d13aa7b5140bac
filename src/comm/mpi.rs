//! MPI transport over the world communicator (feature = "mpi-support").

use mpi::environment::Universe;
use mpi::request::{Request, StaticScope};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::{Communicator, Wait};
use crate::topology::Rank;

/// One MPI process per partition. Owns the universe so finalize runs at
/// drop, after every pending request has been waited on.
pub struct MpiComm {
    universe: Universe,
    rank: Rank,
    size: usize,
}

impl MpiComm {
    /// Attach to (or initialize) the MPI environment.
    ///
    /// Returns `None` when MPI was already initialized by someone else in
    /// this process.
    pub fn new() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world = universe.world();
        let rank = world.rank() as Rank;
        let size = world.size() as usize;
        Some(Self {
            universe,
            rank,
            size,
        })
    }

    fn world(&self) -> SimpleCommunicator {
        self.universe.world()
    }
}

/// Outstanding immediate operation. The posted buffer is owned by the halo
/// exchange and stays alive and unaliased until this is waited on.
pub struct MpiHandle(Request<'static, [u8], StaticScope>);

impl Wait for MpiHandle {
    fn wait(self) -> Option<Vec<u8>> {
        // Data lands directly in the posted buffer.
        let _status = self.0.wait();
        None
    }
}

impl Communicator for MpiComm {
    type SendHandle = MpiHandle;
    type RecvHandle = MpiHandle;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: Rank, tag: u16, buf: &[u8]) -> Self::SendHandle {
        // SAFETY: the caller keeps `buf` alive and untouched until the
        // handle is waited on (trait contract); the request never outlives
        // the wait.
        let buf: &'static [u8] = unsafe { std::mem::transmute(buf) };
        let req = self
            .world()
            .process_at_rank(peer as i32)
            .immediate_send_with_tag(StaticScope, buf, tag as i32);
        MpiHandle(req)
    }

    fn irecv(&self, peer: Rank, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        // SAFETY: as for `isend`; additionally the caller does not read the
        // buffer until the wait confirms delivery.
        let buf: &'static mut [u8] = unsafe { std::mem::transmute(buf) };
        let req = self
            .world()
            .process_at_rank(peer as i32)
            .immediate_receive_into_with_tag(StaticScope, buf, tag as i32);
        MpiHandle(req)
    }
}
