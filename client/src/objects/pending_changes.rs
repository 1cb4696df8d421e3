use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::info;

use asl_shared::{ObjectId, PeerId, RestrictionPayload};

/// An ownership change that arrived before the object it targets
#[derive(Clone, Debug, PartialEq)]
pub enum PendingChange {
    Restriction(RestrictionPayload),
    Transfer { owner: PeerId, epoch: u32 },
}

/// Holds ownership changes for unknown objects until the object is created or
/// the change expires.
pub struct PendingChanges {
    waiting: HashMap<ObjectId, (Instant, Vec<PendingChange>)>,
    ttl: Duration,
}

impl PendingChanges {
    pub fn new(ttl: Duration) -> Self {
        Self {
            waiting: HashMap::new(),
            ttl,
        }
    }

    /// The TTL of an object's queue runs from its first change
    pub fn queue(&mut self, id: ObjectId, change: PendingChange, now: Instant) {
        self.waiting
            .entry(id)
            .or_insert_with(|| (now, Vec::new()))
            .1
            .push(change);
    }

    /// Changes waiting on `id`, in arrival order
    pub fn take(&mut self, id: &ObjectId) -> Vec<PendingChange> {
        self.waiting
            .remove(id)
            .map(|(_, changes)| changes)
            .unwrap_or_default()
    }

    pub fn forget(&mut self, id: &ObjectId) {
        self.waiting.remove(id);
    }

    /// Drops every queue older than the TTL, returning how many changes were lost
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut dropped = 0;
        self.waiting.retain(|id, (queued_at, changes)| {
            if now.saturating_duration_since(*queued_at) < ttl {
                return true;
            }
            info!(
                "Dropping {} ownership change(s) for {}: object never arrived",
                changes.len(),
                id
            );
            dropped += changes.len();
            false
        });
        dropped
    }

    pub fn is_waiting(&self, id: &ObjectId) -> bool {
        self.waiting.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.waiting.values().map(|(_, changes)| changes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
