use std::{default::Default, time::Duration};

use asl_shared::IdSpace;

/// Contains Config properties which will be used by a Peer
#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// Width of each peer's slice of the object id space. Peer `p` allocates
    /// ids from `p * ids_per_peer + 1` up to `(p + 1) * ids_per_peer - 1`.
    pub ids_per_peer: u32,
    /// Memoise resolved templates so repeated instantiation skips the folder
    /// walk
    pub use_template_cache: bool,
    /// Whether the master replays the whole scene to a peer that announces it
    /// joined
    pub sync_on_join: bool,
    /// How long an ownership change for an object that has not been created
    /// yet is held before being dropped
    pub pending_ttl: Duration,
    /// Templates whose instances the master destroys once their creator
    /// leaves the room, e.g. avatars
    pub vestigial_prefabs: Vec<String>,
    /// Vertical distance between consecutive worlds
    pub world_spacing: f32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ids_per_peer: IdSpace::DEFAULT_WIDTH,
            use_template_cache: true,
            sync_on_join: true,
            pending_ttl: Duration::from_secs(60),
            vestigial_prefabs: Vec::new(),
            world_spacing: 1000.0,
        }
    }
}
