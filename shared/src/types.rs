use std::fmt;

/// Actor number assigned to a peer by the session layer. Actor numbers start
/// at 1, `0` is never handed out to a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u32);

impl PeerId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Holder of exclusive mutation rights over a replicated object.
///
/// `Scene` is the reserved "owned by nobody in particular" state: any peer may
/// claim it. Ordering puts `Scene` below every peer, which is what the
/// ownership epoch tie-break relies on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    #[default]
    Scene,
    Peer(PeerId),
}

impl Owner {
    /// Integer encoding used by relays that carry owners as actor numbers: `0` is scene.
    pub fn to_raw(&self) -> u32 {
        match self {
            Owner::Scene => 0,
            Owner::Peer(peer) => peer.value(),
        }
    }

    pub fn from_raw(value: u32) -> Self {
        if value == 0 {
            Owner::Scene
        } else {
            Owner::Peer(PeerId::new(value))
        }
    }

    pub fn peer(&self) -> Option<PeerId> {
        match self {
            Owner::Scene => None,
            Owner::Peer(peer) => Some(*peer),
        }
    }

    pub fn is_scene(&self) -> bool {
        matches!(self, Owner::Scene)
    }
}

/// Milliseconds on the session's shared clock, as stamped by the sender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}
