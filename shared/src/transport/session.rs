use crate::{events::AslEvent, transport::TransportError, PeerId, Timestamp};

/// Who an event is delivered to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receivers {
    /// Every peer in the room except the sender
    Others,
    /// Every peer in the room, the sender included
    All,
    /// The current master, even if that is the sender
    Master,
    Targets(Vec<PeerId>),
}

/// Whether the relay keeps the event for peers that join later
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caching {
    DoNotCache,
    /// Replayed to every peer that joins afterwards, in cache order, before
    /// any live traffic
    AddToRoomCache,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaiseOptions {
    pub receivers: Receivers,
    pub caching: Caching,
}

impl RaiseOptions {
    pub fn to(receivers: Receivers) -> Self {
        Self {
            receivers,
            caching: Caching::DoNotCache,
        }
    }

    pub fn cached(mut self) -> Self {
        self.caching = Caching::AddToRoomCache;
        self
    }
}

/// Something the session layer delivers to a peer
#[derive(Clone, Debug, PartialEq)]
pub enum SessionMessage {
    Event { sender: PeerId, event: AslEvent },
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    MasterChanged(PeerId),
}

/// The networking substrate the object protocol runs on.
///
/// Implementations must deliver the events of any one sender to each receiver
/// in the order they were raised. Nothing is promised about the relative
/// order of events from different senders. While a room is non-empty exactly
/// one of its peers is master.
pub trait Session {
    /// The actor number of this peer, or `None` while disconnected
    fn local_peer(&self) -> Option<PeerId>;

    fn master(&self) -> Option<PeerId>;

    fn is_master(&self) -> bool {
        match (self.local_peer(), self.master()) {
            (Some(local), Some(master)) => local == master,
            _ => false,
        }
    }

    fn is_connected(&self) -> bool {
        self.local_peer().is_some()
    }

    /// Clock shared by every peer in the room
    fn server_time(&self) -> Timestamp;

    fn raise_event(&mut self, event: AslEvent, options: RaiseOptions)
        -> Result<(), TransportError>;

    /// Next pending message, without blocking
    fn receive(&mut self) -> Result<Option<SessionMessage>, TransportError>;
}
