use thiserror::Error;

/// Errors surfaced by a [`Session`](super::Session) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The session has no room, or has been disconnected from it
    #[error("Session is not connected to a room")]
    NotConnected,

    /// The event could not be handed to the relay
    #[error("Failed to send {event} event: {reason}")]
    SendFailed { event: &'static str, reason: String },

    /// The inbound queue could not be read
    #[error("Failed to receive from session: {reason}")]
    ReceiveFailed { reason: String },
}
