use std::ops::Range;

use crate::{ObjectId, PeerId};

/// Partitioning of the object-id space by actor number.
///
/// Peer `p` allocates from `[p * width + 1, (p + 1) * width)`; offset `0` of each
/// partition is never handed out. The creator of any id is therefore
/// recoverable as `id / width`, no matter who owns the object now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdSpace {
    width: u32,
}

impl IdSpace {
    pub const DEFAULT_WIDTH: u32 = 1000;

    /// `width` is clamped to at least 2 so every partition holds one id.
    pub fn new(width: u32) -> Self {
        Self {
            width: width.max(2),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of ids one peer may hold at once
    pub fn capacity(&self) -> u32 {
        self.width - 1
    }

    pub fn range(&self, peer: PeerId) -> Range<u32> {
        let base = peer.value().saturating_mul(self.width);
        base.saturating_add(1)..base.saturating_add(self.width)
    }

    pub fn contains(&self, peer: PeerId, id: &ObjectId) -> bool {
        self.range(peer).contains(&id.value())
    }

    /// Peer whose partition `id` was allocated from. Ids in partition `0` were
    /// not allocated by any peer.
    pub fn creator_of(&self, id: &ObjectId) -> Option<PeerId> {
        match id.value() / self.width {
            0 => None,
            peer => Some(PeerId::new(peer)),
        }
    }
}

impl Default for IdSpace {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH)
    }
}
