use std::collections::BTreeSet;

use log::debug;

use crate::{ids::error::IdError, IdSpace, ObjectId, PeerId};

/// Hands out object ids from the local peer's partition of the [`IdSpace`].
///
/// No central allocator is consulted: partitions are disjoint by construction,
/// so two peers can never produce the same id. Released ids become available
/// again once the cursor wraps around to them.
pub struct IdAllocator {
    peer: PeerId,
    space: IdSpace,
    cursor: u32,
    in_use: BTreeSet<ObjectId>,
}

impl IdAllocator {
    pub fn new(peer: PeerId, space: IdSpace) -> Self {
        Self {
            peer,
            space,
            cursor: 0,
            in_use: BTreeSet::new(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn space(&self) -> &IdSpace {
        &self.space
    }

    pub fn available(&self) -> usize {
        self.space.capacity() as usize - self.in_use.len()
    }

    pub fn is_allocated(&self, id: &ObjectId) -> bool {
        self.in_use.contains(id)
    }

    pub fn allocate(&mut self) -> Result<ObjectId, IdError> {
        self.allocate_set(1).map(|mut ids| ids.remove(0))
    }

    /// Allocates `count` ids at once, or none at all if the partition cannot
    /// hold them.
    pub fn allocate_set(&mut self, count: usize) -> Result<Vec<ObjectId>, IdError> {
        let available = self.available();
        if count > available {
            return Err(IdError::SpaceExhausted {
                peer: self.peer,
                requested: count,
                available,
                capacity: self.space.capacity(),
            });
        }

        let first = self.space.range(self.peer).start;
        let capacity = self.space.capacity();
        let mut output = Vec::with_capacity(count);
        while output.len() < count {
            let candidate = ObjectId::new(first + self.cursor);
            self.cursor = (self.cursor + 1) % capacity;
            if self.in_use.insert(candidate) {
                output.push(candidate);
            }
        }

        Ok(output)
    }

    /// Returns `id` to the pool. Releasing an id that is not allocated is a
    /// no-op, so a second destroy of the same object is harmless.
    pub fn release(&mut self, id: &ObjectId) -> Result<(), IdError> {
        if !self.space.contains(self.peer, id) {
            return Err(IdError::ForeignId {
                id: *id,
                peer: self.peer,
            });
        }
        if !self.in_use.remove(id) {
            debug!("{} was already released", id);
        }
        Ok(())
    }
}
