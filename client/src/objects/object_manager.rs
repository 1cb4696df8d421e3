use std::{collections::HashSet, time::Instant};

use log::{debug, error, info, warn};

use asl_shared::{
    AslEvent, IdAllocator, IdSpace, InstantiatePayload, ObjectEntry, ObjectId, ObjectRegistry,
    Owner, OwnershipError, OwnershipRecord, OwnershipSnapshot, PeerId, RaiseOptions, Receivers,
    RestrictionPayload, SceneMut, SceneRef, SyncScenePayload, TakeOutcome, TemplateCatalog,
    TemplateKind, Transform,
};

use crate::{
    events::PeerEvent,
    objects::pending_changes::{PendingChange, PendingChanges},
    outbox::{Outbox, RoomContext},
    AslClientError, PeerConfig,
};

/// Creates, destroys and arbitrates ownership of replicated objects on one
/// peer, and mirrors what other peers do to theirs.
///
/// Every local change is applied to the registry first and then queued on the
/// [`Outbox`]; events received from the session are applied through the
/// `receive_*` methods. Neither path fails: absent objects, denied claims and
/// unknown templates are logged and reported as `None` / `false`.
pub struct ObjectManager<H> {
    local: PeerId,
    catalog: TemplateCatalog,
    allocator: IdAllocator,
    registry: ObjectRegistry<H>,
    infrastructure: HashSet<String>,
    vestigial: HashSet<String>,
    sync_on_join: bool,
    pending: PendingChanges,
}

impl<H: Copy> ObjectManager<H> {
    pub fn new(local: PeerId, config: &PeerConfig, mut catalog: TemplateCatalog) -> Self {
        catalog.set_use_cache(config.use_template_cache);
        let infrastructure = catalog.infrastructure_tags();

        Self {
            local,
            catalog,
            allocator: IdAllocator::new(local, IdSpace::new(config.ids_per_peer)),
            registry: ObjectRegistry::new(),
            infrastructure,
            vestigial: config.vestigial_prefabs.iter().cloned().collect(),
            sync_on_join: config.sync_on_join,
            pending: PendingChanges::new(config.pending_ttl),
        }
    }

    // Queries

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    pub fn registry(&self) -> &ObjectRegistry<H> {
        &self.registry
    }

    pub fn id_space(&self) -> &IdSpace {
        self.allocator.space()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&ObjectEntry<H>> {
        self.registry.get(id)
    }

    pub fn handle_of(&self, id: &ObjectId) -> Option<H> {
        self.registry.get(id).map(|entry| entry.handle())
    }

    pub fn owner_of(&self, id: &ObjectId) -> Option<Owner> {
        self.registry.get(id).map(|entry| entry.ownership().owner())
    }

    pub fn is_owned_locally(&self, id: &ObjectId) -> bool {
        self.owner_of(id) == Some(Owner::Peer(self.local))
    }

    pub fn is_infrastructure(&self, prefab: &str) -> bool {
        self.infrastructure.contains(prefab)
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    // Instantiation

    pub fn instantiate<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        prefab: &str,
    ) -> Option<ObjectId> {
        self.instantiate_at(scene, ctx, out, prefab, &Transform::identity())
    }

    /// Spawns `prefab` locally with fresh ids from this peer's partition and
    /// tells every other peer to do the same with those ids. The object starts
    /// scene-owned.
    pub fn instantiate_at<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        prefab: &str,
        transform: &Transform,
    ) -> Option<ObjectId> {
        match self.try_instantiate(scene, ctx, out, prefab, transform) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("Unable to instantiate `{}`: {}", prefab, err);
                None
            }
        }
    }

    /// Like [`Self::instantiate_at`], but the object is claimed and restricted
    /// to this peer. The claim and the restriction are sent right after the
    /// creation, so no peer sees the object unrestricted.
    pub fn instantiate_owned<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        prefab: &str,
        transform: &Transform,
    ) -> Option<ObjectId> {
        let id = self.instantiate_at(scene, ctx, out, prefab, transform)?;
        self.request_ownership(out, &id);
        self.restrict_to_self(ctx, out, &id);
        Some(id)
    }

    fn try_instantiate<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        prefab: &str,
        transform: &Transform,
    ) -> Result<ObjectId, AslClientError> {
        let template = self
            .catalog
            .resolve(prefab)
            .ok_or_else(|| AslClientError::UnknownTemplate {
                prefab: prefab.to_string(),
            })?;
        let ids = self.allocator.allocate_set(template.parts())?;
        let root = ids[0];

        let handle = scene.spawn(&template, prefab, transform);
        let entry = ObjectEntry::new(prefab, ids.clone(), handle, prefab, template.kind());
        self.registry.add(entry, ctx.now);

        out.send(
            AslEvent::Instantiate(InstantiatePayload {
                prefab: prefab.to_string(),
                transform: *transform,
                ids,
                timestamp: ctx.now,
                root,
            }),
            RaiseOptions::to(Receivers::Others),
        );
        out.emit(PeerEvent::Spawned {
            id: root,
            prefab: prefab.to_string(),
        });

        Ok(root)
    }

    // Destruction

    /// Broadcasts the destruction of `(name, id)` and removes the local copy.
    /// The broadcast happens even if the object is already gone here, so a
    /// peer can clean up objects it no longer holds.
    pub fn destroy<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        name: &str,
        id: &ObjectId,
    ) -> Option<ObjectEntry<H>> {
        out.send(
            AslEvent::Destroy {
                name: name.to_string(),
                id: *id,
                timestamp: ctx.now,
            },
            RaiseOptions::to(Receivers::Others),
        );
        self.remove_local(scene, ctx, out, name, id)
    }

    pub fn receive_destroy<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        name: &str,
        id: &ObjectId,
    ) -> Option<ObjectEntry<H>> {
        self.remove_local(scene, ctx, out, name, id)
    }

    fn remove_local<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        name: &str,
        id: &ObjectId,
    ) -> Option<ObjectEntry<H>> {
        let Some(root) = self.registry.find(name, id).map(|entry| entry.id()) else {
            debug!("{} `{}` is already gone", id, name);
            return None;
        };
        let entry = self.registry.remove(&root)?;
        self.registry.touch(ctx.now);

        for part in entry.ids() {
            if !self.allocator.space().contains(self.local, part) {
                continue;
            }
            if let Err(err) = self.allocator.release(part) {
                warn!("Unable to release {}: {}", part, err);
            }
        }
        self.pending.forget(&root);
        scene.despawn(&entry.handle());

        out.emit(PeerEvent::Despawned {
            id: root,
            name: entry.name().to_string(),
        });
        Some(entry)
    }

    // Ownership

    /// Claims `id` for this peer. Scene-owned objects are claimed outright,
    /// even restricted ones, which whitelists this peer. An object held by
    /// another peer is taken over if it is unrestricted or this peer is
    /// whitelisted. Returns whether this peer holds the object afterwards.
    pub fn request_ownership(&mut self, out: &mut Outbox, id: &ObjectId) -> bool {
        let local = self.local;
        let Some(entry) = self.registry.get_mut(id) else {
            warn!("Cannot take {}: not in registry", id);
            return false;
        };
        let root = entry.id();

        match entry.ownership_mut().take(local) {
            TakeOutcome::Denied => {
                info!("{} may not take restricted {}", local, root);
                false
            }
            TakeOutcome::AlreadyOwned => true,
            outcome => {
                if let TakeOutcome::TakenOver { previous } = outcome {
                    debug!("{} takes {} over from {}", local, root, previous);
                }
                out.send(
                    AslEvent::OwnershipTransferred {
                        id: root,
                        owner: local,
                        epoch: entry.ownership().epoch(),
                    },
                    RaiseOptions::to(Receivers::Others),
                );
                out.emit(PeerEvent::OwnerChanged {
                    id: root,
                    owner: Owner::Peer(local),
                });
                true
            }
        }
    }

    /// Restricts `id` to this peer plus its existing whitelist
    pub fn restrict(&mut self, ctx: &RoomContext, out: &mut Outbox, id: &ObjectId) -> bool {
        self.edit_restrictions(ctx, out, id, "restrict", |record, local| {
            record.restrict(local)
        })
    }

    /// Restricts `id` to this peer alone
    pub fn restrict_to_self(&mut self, ctx: &RoomContext, out: &mut Outbox, id: &ObjectId) -> bool {
        self.edit_restrictions(ctx, out, id, "restrict", |record, local| {
            record.restrict_to(local)
        })
    }

    /// Restricts `id` to this peer and `whitelist`
    pub fn restrict_ownership(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        id: &ObjectId,
        whitelist: &[PeerId],
    ) -> bool {
        self.edit_restrictions(ctx, out, id, "restrict", |record, local| {
            let restricted = record.restrict(local)?;
            let added = record.whitelist_peers(whitelist.iter().copied());
            Ok(restricted || added)
        })
    }

    pub fn unrestrict(&mut self, ctx: &RoomContext, out: &mut Outbox, id: &ObjectId) -> bool {
        self.edit_restrictions(ctx, out, id, "unrestrict", |record, local| {
            record.unrestrict(local)
        })
    }

    pub fn whitelist(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        id: &ObjectId,
        peers: &[PeerId],
    ) -> bool {
        self.edit_restrictions(ctx, out, id, "whitelist", |record, _| {
            Ok(record.whitelist_peers(peers.iter().copied()))
        })
    }

    pub fn blacklist(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        id: &ObjectId,
        peers: &[PeerId],
    ) -> bool {
        self.edit_restrictions(ctx, out, id, "blacklist", |record, _| {
            Ok(record.blacklist_peers(peers.iter().copied()))
        })
    }

    /// Runs a restriction edit on an object this peer holds, and broadcasts
    /// the outcome only if it changed anything
    fn edit_restrictions<F>(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        id: &ObjectId,
        operation: &'static str,
        edit: F,
    ) -> bool
    where
        F: FnOnce(&mut OwnershipRecord, PeerId) -> Result<bool, OwnershipError>,
    {
        let local = self.local;
        let Some(entry) = self.registry.get_mut(id) else {
            warn!("Cannot {} {}: not in registry", operation, id);
            return false;
        };
        if !entry.ownership().is_owned_by(local) {
            let err = OwnershipError::NotOwner {
                peer: local,
                operation,
            };
            warn!("Cannot {} {}: {}", operation, id, err);
            return false;
        }

        let owner_before = entry.ownership().owner();
        match edit(entry.ownership_mut(), local) {
            Ok(false) => true,
            Ok(true) => {
                let record = entry.ownership();
                let payload = RestrictionPayload {
                    name: entry.name().to_string(),
                    id: entry.id(),
                    restricted: record.is_restricted(),
                    whitelist: record.whitelist(),
                    timestamp: ctx.now,
                };
                out.emit(PeerEvent::RestrictionsChanged {
                    id: payload.id,
                    restricted: payload.restricted,
                    whitelist: payload.whitelist.clone(),
                });
                if record.owner() != owner_before {
                    out.emit(PeerEvent::OwnerChanged {
                        id: payload.id,
                        owner: record.owner(),
                    });
                }
                out.send(
                    AslEvent::OwnershipRestrictionChanged(payload),
                    RaiseOptions::to(Receivers::Others),
                );
                true
            }
            Err(err) => {
                warn!("Cannot {} {}: {}", operation, id, err);
                false
            }
        }
    }

    // Late-join sync

    /// Replays every non-infrastructure object to `target` as if it had just
    /// been created, ownership state included. Returns how many were sent.
    pub fn force_sync_scene<R: SceneRef<H>>(
        &self,
        scene: &R,
        ctx: &RoomContext,
        out: &mut Outbox,
        target: PeerId,
    ) -> usize {
        let mut sent = 0;
        for entry in self.registry.iter() {
            if entry.kind() == TemplateKind::Infrastructure || self.is_infrastructure(entry.prefab())
            {
                continue;
            }
            let transform = scene.transform(&entry.handle()).unwrap_or_default();
            let payload = SyncScenePayload {
                target,
                object: InstantiatePayload {
                    prefab: entry.prefab().to_string(),
                    transform,
                    ids: entry.ids().to_vec(),
                    timestamp: ctx.now,
                    root: entry.id(),
                },
                ownership: entry.ownership().snapshot(),
            };
            out.send(
                AslEvent::SyncScene(payload),
                RaiseOptions::to(Receivers::Targets(vec![target])),
            );
            sent += 1;
        }

        info!("Replayed {} object(s) to {}", sent, target);
        out.emit(PeerEvent::SceneSyncSent {
            target,
            objects: sent,
        });
        sent
    }

    /// A peer announced it joined. Only the master answers, and only when
    /// configured to.
    pub fn receive_join<R: SceneRef<H>>(
        &self,
        scene: &R,
        ctx: &RoomContext,
        out: &mut Outbox,
        sender: PeerId,
    ) -> usize {
        if !ctx.is_master() {
            debug!("Ignoring join of {}: {} is not master", sender, self.local);
            return 0;
        }
        if !self.sync_on_join {
            return 0;
        }
        self.force_sync_scene(scene, ctx, out, sender)
    }

    pub fn receive_sync_scene<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        payload: SyncScenePayload,
    ) -> Option<ObjectId> {
        if payload.target != self.local {
            debug!("Ignoring scene sync addressed to {}", payload.target);
            return None;
        }

        let root = payload.object.root;
        let Some(entry) = self.registry.get_mut(&root) else {
            return self.spawn_remote(scene, ctx, out, &payload.object, Some(&payload.ownership));
        };

        // Already known: refresh instead of spawning a duplicate
        scene.set_transform(&entry.handle(), &payload.object.transform);
        if payload.ownership.epoch < entry.ownership().epoch() {
            debug!("Keeping newer ownership of {} over replayed state", root);
            return Some(root);
        }
        let before = entry.ownership().snapshot();
        entry.ownership_mut().apply_snapshot(&payload.ownership);
        let after = entry.ownership().snapshot();
        emit_ownership_diff(out, root, &before, &after);

        Some(root)
    }

    // Remote creation and ownership changes

    pub fn receive_instantiate<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        payload: InstantiatePayload,
    ) -> Option<ObjectId> {
        self.spawn_remote(scene, ctx, out, &payload, None)
    }

    fn spawn_remote<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        payload: &InstantiatePayload,
        ownership: Option<&OwnershipSnapshot>,
    ) -> Option<ObjectId> {
        if !payload.is_well_formed() {
            warn!("Dropping malformed creation of `{}`", payload.prefab);
            return None;
        }
        let root = payload.root;
        if self.registry.contains(&root) {
            debug!("{} already exists, ignoring duplicate creation", root);
            return None;
        }

        let template = self.catalog.resolve(&payload.prefab)?;
        if template.parts() != payload.ids.len() {
            error!(
                "Template `{}` has {} replicable part(s) but {} id(s) arrived for {}, not spawning",
                payload.prefab,
                template.parts(),
                payload.ids.len(),
                root
            );
            return None;
        }

        let handle = scene.spawn(&template, &payload.prefab, &payload.transform);
        let record = ownership
            .map(OwnershipRecord::from_snapshot)
            .unwrap_or_default();
        let entry = ObjectEntry::new(
            &payload.prefab,
            payload.ids.clone(),
            handle,
            &payload.prefab,
            template.kind(),
        )
        .with_ownership(record);
        self.registry.add(entry, ctx.now);

        out.emit(PeerEvent::Spawned {
            id: root,
            prefab: payload.prefab.clone(),
        });
        self.apply_pending(ctx, out, &root);

        Some(root)
    }

    pub fn receive_restrictions(&mut self, ctx: &RoomContext, out: &mut Outbox, payload: RestrictionPayload) {
        let Some(entry) = self.registry.get_mut(&payload.id) else {
            debug!("Holding restriction change for unknown {}", payload.id);
            self.pending
                .queue(payload.id, PendingChange::Restriction(payload), ctx.instant);
            return;
        };

        let root = entry.id();
        let reset = entry
            .ownership_mut()
            .set_restrictions(payload.restricted, payload.whitelist.iter().copied());

        out.emit(PeerEvent::RestrictionsChanged {
            id: root,
            restricted: entry.ownership().is_restricted(),
            whitelist: entry.ownership().whitelist(),
        });
        if reset {
            info!("{} returned to scene: holder is no longer whitelisted", root);
            out.emit(PeerEvent::OwnerChanged {
                id: root,
                owner: Owner::Scene,
            });
        }
    }

    pub fn receive_transfer(
        &mut self,
        ctx: &RoomContext,
        out: &mut Outbox,
        sender: PeerId,
        id: ObjectId,
        owner: PeerId,
        epoch: u32,
    ) {
        if owner != sender {
            warn!("{} claimed {} on behalf of {}, ignoring", sender, id, owner);
            return;
        }
        let local = self.local;
        let Some(entry) = self.registry.get_mut(&id) else {
            debug!("Holding claim on unknown {} by {}", id, owner);
            self.pending
                .queue(id, PendingChange::Transfer { owner, epoch }, ctx.instant);
            return;
        };

        let held_locally = entry.ownership().is_owned_by(local);
        match entry.ownership_mut().apply_transfer(owner, epoch) {
            Ok(true) => {
                if held_locally {
                    info!("{} relinquishes {} to {}", local, id, owner);
                }
                out.emit(PeerEvent::OwnerChanged {
                    id: entry.id(),
                    owner: Owner::Peer(owner),
                });
            }
            Ok(false) => debug!("Ignoring stale claim on {} by {}", id, owner),
            Err(err) => warn!("Rejecting claim on {}: {}", id, err),
        }
    }

    fn apply_pending(&mut self, ctx: &RoomContext, out: &mut Outbox, id: &ObjectId) {
        for change in self.pending.take(id) {
            match change {
                PendingChange::Restriction(payload) => self.receive_restrictions(ctx, out, payload),
                PendingChange::Transfer { owner, epoch } => {
                    self.receive_transfer(ctx, out, owner, *id, owner, epoch)
                }
            }
        }
    }

    pub fn expire_pending(&mut self, now: Instant) -> usize {
        self.pending.expire(now)
    }

    // Departures

    /// Returns everything `peer` held to the scene. On the master, also
    /// destroys the vestigial objects `peer` created, returning them.
    pub fn peer_left<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        peer: PeerId,
    ) -> Vec<ObjectEntry<H>> {
        for entry in self.registry.iter_mut() {
            if !entry.ownership().is_owned_by(peer) {
                continue;
            }
            entry.ownership_mut().reset_to_scene();
            out.emit(PeerEvent::OwnerChanged {
                id: entry.id(),
                owner: Owner::Scene,
            });
        }

        if !ctx.is_master() {
            return Vec::new();
        }

        let space = *self.allocator.space();
        let vestigial: Vec<(String, ObjectId)> = self
            .registry
            .iter()
            .filter(|entry| self.vestigial.contains(entry.prefab()))
            .filter(|entry| space.creator_of(&entry.id()) == Some(peer))
            .map(|entry| (entry.name().to_string(), entry.id()))
            .collect();

        vestigial
            .into_iter()
            .filter_map(|(name, id)| {
                info!("Destroying `{}` {} left behind by {}", name, id, peer);
                self.destroy(scene, ctx, out, &name, &id)
            })
            .collect()
    }
}

fn emit_ownership_diff(
    out: &mut Outbox,
    id: ObjectId,
    before: &OwnershipSnapshot,
    after: &OwnershipSnapshot,
) {
    if before.restricted != after.restricted || before.whitelist != after.whitelist {
        out.emit(PeerEvent::RestrictionsChanged {
            id,
            restricted: after.restricted,
            whitelist: after.whitelist.clone(),
        });
    }
    if before.owner != after.owner {
        out.emit(PeerEvent::OwnerChanged {
            id,
            owner: after.owner,
        });
    }
}
