use thiserror::Error as ThisError;

use crate::{ObjectId, PeerId};

/// Errors raised by the per-peer id allocator
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum IdError {
    /// Every id in the peer's partition is currently allocated
    #[error("Id space of {peer} is exhausted: {requested} requested, {available} of {capacity} available")]
    SpaceExhausted {
        peer: PeerId,
        requested: usize,
        available: usize,
        capacity: u32,
    },

    /// Attempted to release an id allocated from another peer's partition
    #[error("{id} does not belong to the id partition of {peer}")]
    ForeignId { id: ObjectId, peer: PeerId },
}
