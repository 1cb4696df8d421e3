use thiserror::Error;

use asl_shared::{IdError, ObjectId, OwnershipError, TransportError};

/// Errors surfaced by a [`Peer`](crate::Peer)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AslClientError {
    /// The session had no local actor number when the peer was built
    #[error("Peer cannot be created from a session that is not connected to a room")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Id allocation error: {0}")]
    Id(#[from] IdError),

    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    /// No template with this tag exists in the catalog
    #[error("Template `{prefab}` not found in catalog")]
    UnknownTemplate { prefab: String },

    /// The object is not (or no longer) in the local registry
    #[error("{id} is not in the local registry")]
    UnknownObject { id: ObjectId },

    /// A bulk byte-stream transfer could not be completed
    #[error("Bulk transfer `{key}` failed: {reason}")]
    BulkTransferFailed { key: String, reason: String },
}
