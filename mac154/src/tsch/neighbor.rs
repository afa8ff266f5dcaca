//! Per-neighbor transmission queues.
//!
//! Every neighbor carries a FIFO of frames awaiting its TX links. The
//! queue length doubles as the back-pressure signal the link comparator
//! uses to prioritize the fullest queue.

use heapless::{Deque, Vec};
use mac154_frame::Address;

use crate::phy::FrameBuffer;
use crate::{Error, Result};

/// The maximum number of neighbors with pending traffic.
pub const MAX_NEIGHBORS: usize = 8;
/// The depth of a single neighbor's TX queue.
pub const TX_QUEUE_DEPTH: usize = 4;

struct Neighbor {
    addr: Address,
    queue: Deque<FrameBuffer, TX_QUEUE_DEPTH>,
}

/// The table of neighbors with pending TX frames.
#[derive(Default)]
pub struct NeighborTable {
    neighbors: Vec<Neighbor, MAX_NEIGHBORS>,
}

impl NeighborTable {
    /// Create an empty neighbor table.
    pub const fn new() -> Self {
        Self {
            neighbors: Vec::new(),
        }
    }

    fn position(&self, addr: &Address) -> Option<usize> {
        self.neighbors.iter().position(|n| n.addr == *addr)
    }

    /// Queue a frame for the given neighbor.
    ///
    /// # Errors
    ///
    /// `NoMemory` when the neighbor's queue or the table is full.
    pub fn enqueue(&mut self, addr: Address, frame: FrameBuffer) -> Result<()> {
        let at = match self.position(&addr) {
            Some(at) => at,
            None => {
                self.neighbors
                    .push(Neighbor {
                        addr,
                        queue: Deque::new(),
                    })
                    .map_err(|_| Error::NoMemory)?;
                self.neighbors.len() - 1
            }
        };

        self.neighbors[at]
            .queue
            .push_back(frame)
            .map_err(|_| Error::NoMemory)
    }

    /// Take the oldest queued frame for the given neighbor.
    ///
    /// # Errors
    ///
    /// `NoData` when nothing is queued.
    pub fn dequeue(&mut self, addr: &Address) -> Result<FrameBuffer> {
        let at = self.position(addr).ok_or(Error::NoData)?;
        let frame = self.neighbors[at].queue.pop_front().ok_or(Error::NoData)?;

        // Drop drained neighbors so the table does not fill up with
        // one-shot peers.
        if self.neighbors[at].queue.is_empty() {
            self.neighbors.swap_remove(at);
        }

        Ok(frame)
    }

    /// The number of frames queued for the given neighbor.
    pub fn queue_size(&self, addr: &Address) -> usize {
        self.position(addr)
            .map_or(0, |at| self.neighbors[at].queue.len())
    }
}
