use crate::{
    events::payload::{InstantiatePayload, RestrictionPayload, SyncScenePayload},
    ObjectId, PeerId, Timestamp,
};

/// Every message the object protocol puts on the session
#[derive(Clone, Debug, PartialEq)]
pub enum AslEvent {
    Instantiate(InstantiatePayload),
    Destroy {
        name: String,
        id: ObjectId,
        timestamp: Timestamp,
    },
    OwnershipRestrictionChanged(RestrictionPayload),
    /// `owner` claimed the object; applied only if newer than the local record
    OwnershipTransferred {
        id: ObjectId,
        owner: PeerId,
        epoch: u32,
    },
    /// Sent to the master by a peer that just entered the room
    Join,
    SyncScene(SyncScenePayload),
    Portal {
        phase: ArbitrationPhase,
        action: PortalAction,
    },
    World(WorldAction),
}

impl AslEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AslEvent::Instantiate(_) => "Instantiate",
            AslEvent::Destroy { .. } => "Destroy",
            AslEvent::OwnershipRestrictionChanged(_) => "OwnershipRestrictionChanged",
            AslEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            AslEvent::Join => "Join",
            AslEvent::SyncScene(_) => "SyncScene",
            AslEvent::Portal { .. } => "Portal",
            AslEvent::World(_) => "World",
        }
    }
}

/// Stage of a master-arbitrated change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbitrationPhase {
    /// Sent point-to-point to the master, not yet applied anywhere
    Request,
    /// Validated and applied by the master, rebroadcast to everyone else
    Approved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalAction {
    Register(ObjectId),
    Unregister(ObjectId),
    Link {
        source: ObjectId,
        destination: ObjectId,
    },
    Unlink(ObjectId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldAction {
    Add(ObjectId),
    AddTo { world: ObjectId, object: ObjectId },
}
