use thiserror::Error as ThisError;

use crate::PeerId;

/// Errors raised by the ownership state machine
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum OwnershipError {
    /// A restriction change was attempted by a peer that does not hold the object
    #[error("{peer} must hold the object to {operation} it")]
    NotOwner {
        peer: PeerId,
        operation: &'static str,
    },

    /// A claim was made on a restricted object by a peer outside its whitelist
    #[error("{peer} is not whitelisted on a restricted object")]
    NotWhitelisted { peer: PeerId },
}
