use std::{collections::BTreeMap, ops::Bound};

use log::{debug, info, warn};

use asl_shared::{
    ArbitrationPhase, AslEvent, ObjectId, ObjectRegistry, PeerId, PortalAction, RaiseOptions,
    Receivers,
};

use crate::{
    events::PeerEvent,
    outbox::{Outbox, RoomContext},
};

/// Master-arbitrated set of registered portals and their links.
///
/// Peers never change this set directly. A `request_*` call pre-checks
/// against local state and sends the request to the master; the master
/// validates it against its own state, applies it and rebroadcasts the
/// approved change (cached in the room) to everyone else. Rejected requests
/// are dropped without telling the requester.
#[derive(Default)]
pub struct PortalManager {
    portals: BTreeMap<ObjectId, Option<ObjectId>>,
}

impl PortalManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Queries

    pub fn is_registered(&self, id: &ObjectId) -> bool {
        self.portals.contains_key(id)
    }

    pub fn destination(&self, source: &ObjectId) -> Option<ObjectId> {
        self.portals.get(source).copied().flatten()
    }

    pub fn portal_ids(&self) -> Vec<ObjectId> {
        self.portals.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    /// Registered portal following `current` in id order, wrapping around.
    /// With no `current`, the first portal.
    pub fn next_portal_id(&self, current: Option<&ObjectId>) -> Option<ObjectId> {
        let first = self.portals.keys().next().copied();
        let Some(current) = current else {
            return first;
        };
        self.portals
            .range((Bound::Excluded(*current), Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
            .or(first)
    }

    pub fn log_portal_states(&self) {
        info!("{} registered portal(s)", self.portals.len());
        for (source, destination) in &self.portals {
            match destination {
                Some(destination) => info!("  {} -> {}", source, destination),
                None => info!("  {} (unlinked)", source),
            }
        }
    }

    // Requests

    pub fn request_register(&self, out: &mut Outbox, id: ObjectId) -> bool {
        self.request(out, PortalAction::Register(id))
    }

    pub fn request_unregister(&self, out: &mut Outbox, id: ObjectId) -> bool {
        self.request(out, PortalAction::Unregister(id))
    }

    pub fn request_link(&self, out: &mut Outbox, source: ObjectId, destination: ObjectId) -> bool {
        self.request(out, PortalAction::Link {
            source,
            destination,
        })
    }

    pub fn request_unlink(&self, out: &mut Outbox, source: ObjectId) -> bool {
        self.request(out, PortalAction::Unlink(source))
    }

    /// Resolves both portals by display name, taking the most recently
    /// created object with each name
    pub fn request_link_by_name<H: Copy>(
        &self,
        out: &mut Outbox,
        registry: &ObjectRegistry<H>,
        source: &str,
        destination: &str,
    ) -> bool {
        let (Some(source_entry), Some(destination_entry)) =
            (registry.get_by_name(source), registry.get_by_name(destination))
        else {
            warn!("Cannot link `{}` to `{}`: object not found", source, destination);
            return false;
        };
        self.request_link(out, source_entry.id(), destination_entry.id())
    }

    /// Returns whether the request passed the local pre-check and was sent.
    /// It says nothing about whether the master will approve it.
    fn request(&self, out: &mut Outbox, action: PortalAction) -> bool {
        if !self.validate(&action) {
            debug!("Not requesting {:?}: fails local pre-check", action);
            return false;
        }
        out.send(
            AslEvent::Portal {
                phase: ArbitrationPhase::Request,
                action,
            },
            RaiseOptions::to(Receivers::Master),
        );
        true
    }

    // Arbitration

    pub fn receive(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        sender: PeerId,
        phase: ArbitrationPhase,
        action: PortalAction,
    ) {
        match phase {
            ArbitrationPhase::Request => self.arbitrate(ctx, out, sender, action),
            ArbitrationPhase::Approved => {
                if self.commit(out, action) {
                    return;
                }
                match action {
                    // Destroyed portals are dropped before their unregister arrives
                    PortalAction::Unregister(id) => {
                        debug!("{} already unregistered", id)
                    }
                    _ => warn!("Approved {:?} from {} does not apply locally", action, sender),
                }
            }
        }
    }

    fn arbitrate(&mut self, ctx: &RoomContext, out: &mut Outbox, requester: PeerId, action: PortalAction) {
        if !ctx.is_master() {
            debug!("Ignoring {:?} request from {}: not master", action, requester);
            return;
        }
        if !self.validate(&action) {
            info!("Rejecting {:?} requested by {}", action, requester);
            out.emit(PeerEvent::PortalRequestRejected { requester, action });
            return;
        }

        self.commit(out, action);
        out.send(
            AslEvent::Portal {
                phase: ArbitrationPhase::Approved,
                action,
            },
            RaiseOptions::to(Receivers::Others).cached(),
        );
    }

    fn validate(&self, action: &PortalAction) -> bool {
        match action {
            PortalAction::Register(id) => !self.is_registered(id),
            PortalAction::Unregister(id) => self.is_registered(id),
            PortalAction::Link {
                source,
                destination,
            } => self.is_registered(source) && self.is_registered(destination),
            PortalAction::Unlink(source) => self.destination(source).is_some(),
        }
    }

    /// Applies an approved change. Returns `false` if it did not fit the
    /// current state.
    fn commit(&mut self, out: &mut Outbox, action: PortalAction) -> bool {
        match action {
            PortalAction::Register(id) => {
                if self.is_registered(&id) {
                    return false;
                }
                self.portals.insert(id, None);
                out.emit(PeerEvent::PortalRegistered(id));
                true
            }
            PortalAction::Unregister(id) => self.remove(out, &id),
            PortalAction::Link {
                source,
                destination,
            } => {
                if !self.is_registered(&destination) {
                    return false;
                }
                let Some(slot) = self.portals.get_mut(&source) else {
                    return false;
                };
                if slot.replace(destination).is_some() {
                    out.emit(PeerEvent::PortalUnlinked(source));
                }
                out.emit(PeerEvent::PortalLinked {
                    source,
                    destination,
                });
                true
            }
            PortalAction::Unlink(source) => match self.portals.get_mut(&source) {
                Some(slot) if slot.is_some() => {
                    *slot = None;
                    out.emit(PeerEvent::PortalUnlinked(source));
                    true
                }
                _ => false,
            },
        }
    }

    /// Drops a destroyed object from the portal set without arbitration;
    /// every peer sees the destruction itself. The master also records the
    /// unregister in the room cache, so that replayed approvals end without
    /// the portal.
    pub fn forget(&mut self, ctx: &RoomContext, out: &mut Outbox, id: &ObjectId) {
        if !self.remove(out, id) || !ctx.is_master() {
            return;
        }
        debug!("Caching unregister of destroyed portal {}", id);
        out.send(
            AslEvent::Portal {
                phase: ArbitrationPhase::Approved,
                action: PortalAction::Unregister(*id),
            },
            RaiseOptions::to(Receivers::Others).cached(),
        );
    }

    fn remove(&mut self, out: &mut Outbox, id: &ObjectId) -> bool {
        if self.portals.remove(id).is_none() {
            return false;
        }
        for (source, destination) in self.portals.iter_mut() {
            if *destination == Some(*id) {
                *destination = None;
                out.emit(PeerEvent::PortalUnlinked(*source));
            }
        }
        out.emit(PeerEvent::PortalUnregistered(*id));
        true
    }
}
