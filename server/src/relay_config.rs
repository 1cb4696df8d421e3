use std::default::Default;

/// How the relay orders messages coming from different senders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOrder {
    /// Messages reach each peer in the order the relay accepted them
    Arrival,
    /// Senders are drawn at random for every delivery, so messages from
    /// different senders interleave. Messages of one sender stay in order.
    Interleaved { seed: u64 },
}

/// Contains Config properties which will be used by the Relay
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Maximum number of peers in the room at once, if any
    pub max_peers: Option<usize>,
    /// Cross-sender delivery order
    pub delivery: DeliveryOrder,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_peers: None,
            delivery: DeliveryOrder::Arrival,
        }
    }
}
