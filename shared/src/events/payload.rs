use crate::{object::ownership::OwnershipSnapshot, ObjectId, PeerId, Timestamp, Transform};

/// Everything a peer needs to rebuild an instance another peer created
#[derive(Clone, Debug, PartialEq)]
pub struct InstantiatePayload {
    pub prefab: String,
    pub transform: Transform,
    /// Root id first, then one id per replicable child part
    pub ids: Vec<ObjectId>,
    pub timestamp: Timestamp,
    pub root: ObjectId,
}

impl InstantiatePayload {
    /// A payload is usable when it carries at least one id and its root id
    /// leads the id set.
    pub fn is_well_formed(&self) -> bool {
        self.ids.first() == Some(&self.root)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestrictionPayload {
    pub name: String,
    pub id: ObjectId,
    pub restricted: bool,
    pub whitelist: Vec<PeerId>,
    pub timestamp: Timestamp,
}

/// One object replayed to a single late-joining peer
#[derive(Clone, Debug, PartialEq)]
pub struct SyncScenePayload {
    pub target: PeerId,
    pub object: InstantiatePayload,
    pub ownership: OwnershipSnapshot,
}
