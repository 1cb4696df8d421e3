use thiserror::Error;

use asl_shared::PeerId;

/// Errors raised by the room relay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The room already holds its configured maximum of peers
    #[error("Room is full: {max} peer(s) allowed")]
    RoomFull { max: usize },

    /// The peer is not (or no longer) in the room
    #[error("{peer} is not in the room")]
    UnknownPeer { peer: PeerId },

    /// A thread panicked while holding the room lock
    #[error("Room state lock was poisoned")]
    LockPoisoned,
}
