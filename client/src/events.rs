use std::vec::IntoIter;

use asl_shared::{ObjectId, Owner, PeerId, PortalAction};

use crate::AslClientError;

/// Something that happened to the local view of the room
#[derive(Clone, Debug, PartialEq)]
pub enum PeerEvent {
    Spawned { id: ObjectId, prefab: String },
    Despawned { id: ObjectId, name: String },
    OwnerChanged { id: ObjectId, owner: Owner },
    RestrictionsChanged {
        id: ObjectId,
        restricted: bool,
        whitelist: Vec<PeerId>,
    },
    PortalRegistered(ObjectId),
    PortalUnregistered(ObjectId),
    PortalLinked { source: ObjectId, destination: ObjectId },
    PortalUnlinked(ObjectId),
    /// Only raised on the master. The requester is not told.
    PortalRequestRejected { requester: PeerId, action: PortalAction },
    WorldAdded(ObjectId),
    AddedToWorld { world: ObjectId, object: ObjectId },
    SceneSyncSent { target: PeerId, objects: usize },
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    MasterChanged(PeerId),
    BulkReceived { key: String, bytes: Vec<u8> },
    Error(AslClientError),
}

/// Batch of [`PeerEvent`]s drained by one call to `Peer::receive`
#[derive(Debug, Default)]
pub struct PeerEvents {
    events: Vec<PeerEvent>,
}

impl PeerEvents {
    pub(crate) fn new(events: Vec<PeerEvent>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerEvent> {
        self.events.iter()
    }

    pub fn spawned(&self) -> Vec<ObjectId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PeerEvent::Spawned { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn despawned(&self) -> Vec<ObjectId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PeerEvent::Despawned { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&AslClientError> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PeerEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }
}

impl IntoIterator for PeerEvents {
    type Item = PeerEvent;
    type IntoIter = IntoIter<PeerEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
