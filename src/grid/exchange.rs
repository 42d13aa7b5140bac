//! In-flight request bookkeeping for one halo-exchange round.
//!
//! A [`PendingExchange`] tracks exactly the directions that have a neighbor
//! (0-4 sends, 0-4 receives) and exposes the two named completion points the
//! drivers sequence against. Handles are consumed by the waits; a round is
//! over when both sides are drained.

use crate::comm::{Communicator, Wait};
use crate::error::HaloGridError;
use crate::topology::{Direction, Rank};
use crate::wire;

/// One posted receive: where the payload belongs and how large it must be.
struct PostedRecv<C: Communicator> {
    dir: Direction,
    neighbor: Rank,
    expected_bytes: usize,
    handle: C::RecvHandle,
}

/// A payload confirmed complete by [`PendingExchange::wait_recvs`].
///
/// `payload` is `Some` when the transport delivered out of band (the caller
/// must copy it into place) and `None` when the transport wrote directly
/// into the posted buffer.
pub struct Delivery {
    /// Direction the receive was posted for.
    pub dir: Direction,
    /// Peer the payload came from.
    pub neighbor: Rank,
    /// Out-of-band payload, length-checked against the posted buffer.
    pub payload: Option<Vec<u8>>,
}

/// Outstanding sends and receives of the most recent exchange initiation.
pub struct PendingExchange<C: Communicator> {
    sends: Vec<(Rank, C::SendHandle)>,
    recvs: Vec<PostedRecv<C>>,
}

impl<C: Communicator> PendingExchange<C> {
    /// An empty request set, capacity for the active neighbor count.
    pub fn with_capacity(neighbors: usize) -> Self {
        Self {
            sends: Vec::with_capacity(neighbors),
            recvs: Vec::with_capacity(neighbors),
        }
    }

    /// Track a posted send.
    pub fn push_send(&mut self, neighbor: Rank, handle: C::SendHandle) {
        self.sends.push((neighbor, handle));
    }

    /// Track a posted receive and the byte length its buffer demands.
    pub fn push_recv(
        &mut self,
        dir: Direction,
        neighbor: Rank,
        expected_bytes: usize,
        handle: C::RecvHandle,
    ) {
        self.recvs.push(PostedRecv {
            dir,
            neighbor,
            expected_bytes,
            handle,
        });
    }

    /// Sends still outstanding.
    pub fn outstanding_sends(&self) -> usize {
        self.sends.len()
    }

    /// Receives still outstanding.
    pub fn outstanding_recvs(&self) -> usize {
        self.recvs.len()
    }

    /// Both sides drained; the round is over.
    pub fn is_drained(&self) -> bool {
        self.sends.is_empty() && self.recvs.is_empty()
    }

    /// Block until every outstanding send has completed.
    pub fn wait_sends(&mut self) -> Result<(), HaloGridError> {
        for (_neighbor, handle) in self.sends.drain(..) {
            let _ = handle.wait();
        }
        Ok(())
    }

    /// Block until every outstanding receive has completed, validating
    /// out-of-band payload lengths.
    ///
    /// # Errors
    /// [`HaloGridError::Comm`] when a payload does not match the length the
    /// protocol posted for it. All handles are drained before the error is
    /// returned, so a failed round never leaves requests dangling.
    pub fn wait_recvs(&mut self) -> Result<Vec<Delivery>, HaloGridError> {
        let mut deliveries = Vec::with_capacity(self.recvs.len());
        let mut first_err = None;
        for posted in self.recvs.drain(..) {
            let payload = posted.handle.wait();
            if let Some(data) = &payload {
                if let Err(msg) = wire::expect_exact_len(data.len(), posted.expected_bytes) {
                    if first_err.is_none() {
                        first_err = Some(HaloGridError::Comm {
                            neighbor: posted.neighbor,
                            reason: msg,
                        });
                    }
                    continue;
                }
            }
            deliveries.push(Delivery {
                dir: posted.dir,
                neighbor: posted.neighbor,
                payload,
            });
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(deliveries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;

    #[test]
    fn waits_drain_their_sides_independently() {
        let mut p: PendingExchange<NoComm> = PendingExchange::with_capacity(1);
        assert!(p.is_drained());
        p.push_send(1, ());
        p.push_recv(Direction::Up, 1, 8, ());
        assert_eq!(p.outstanding_sends(), 1);
        assert_eq!(p.outstanding_recvs(), 1);

        p.wait_sends().unwrap();
        assert_eq!(p.outstanding_sends(), 0);
        assert!(!p.is_drained());

        let deliveries = p.wait_recvs().unwrap();
        assert!(p.is_drained());
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].dir, Direction::Up);
        assert_eq!(deliveries[0].neighbor, 1);
        // a no-op transport reports in-place delivery
        assert!(deliveries[0].payload.is_none());
    }
}
