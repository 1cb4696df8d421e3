use std::collections::{BTreeMap, VecDeque};

use fastrand::Rng;

use asl_shared::{PeerId, SessionMessage};

use crate::DeliveryOrder;

/// Where a queued message came from. Each lane is strictly FIFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Lane {
    /// Room cache replayed on connect, always drained first
    Cache,
    /// Join, leave and master notices
    Room,
    Peer(PeerId),
}

/// Messages waiting for one peer
pub(crate) struct Inbox {
    lanes: BTreeMap<Lane, VecDeque<SessionMessage>>,
    arrivals: VecDeque<Lane>,
    track_arrivals: bool,
}

impl Inbox {
    pub fn new(delivery: DeliveryOrder) -> Self {
        Self {
            lanes: BTreeMap::new(),
            arrivals: VecDeque::new(),
            track_arrivals: delivery == DeliveryOrder::Arrival,
        }
    }

    pub fn push(&mut self, lane: Lane, message: SessionMessage) {
        self.lanes.entry(lane).or_default().push_back(message);
        if self.track_arrivals && lane != Lane::Cache {
            self.arrivals.push_back(lane);
        }
    }

    pub fn pop(&mut self, delivery: DeliveryOrder, rng: &mut Rng) -> Option<SessionMessage> {
        if let Some(message) = self.pop_lane(Lane::Cache) {
            return Some(message);
        }

        let lane = match delivery {
            DeliveryOrder::Arrival => self.arrivals.pop_front()?,
            DeliveryOrder::Interleaved { .. } => {
                if self.lanes.is_empty() {
                    return None;
                }
                let pick = rng.usize(..self.lanes.len());
                *self.lanes.keys().nth(pick)?
            }
        };
        self.pop_lane(lane)
    }

    pub fn len(&self) -> usize {
        self.lanes.values().map(VecDeque::len).sum()
    }

    fn pop_lane(&mut self, lane: Lane) -> Option<SessionMessage> {
        let queue = self.lanes.get_mut(&lane)?;
        let message = queue.pop_front();
        if queue.is_empty() {
            self.lanes.remove(&lane);
        }
        message
    }
}
