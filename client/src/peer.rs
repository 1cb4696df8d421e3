use std::{io::Read, time::Instant};

use log::{debug, info, warn};

use asl_shared::{
    AslEvent, ObjectId, PeerId, RaiseOptions, Receivers, SceneMut, SceneRef, Session,
    SessionMessage, TemplateCatalog, Transform,
};

use crate::{
    bulk::BulkTransfers,
    events::{PeerEvent, PeerEvents},
    objects::ObjectManager,
    outbox::{Outbox, RoomContext},
    portals::PortalManager,
    worlds::WorldManager,
    AslClientError, PeerConfig,
};

/// One participant in a room: owns the session and every protocol manager,
/// and is the only thing that talks to the session.
///
/// Operations take effect locally at once and are flushed to the session
/// before they return. Events from other peers are applied in
/// [`Peer::receive`], which also reports everything that happened locally
/// since the previous call.
pub struct Peer<H, S: Session> {
    session: S,
    local: PeerId,
    objects: ObjectManager<H>,
    portals: PortalManager,
    worlds: WorldManager,
    bulk: BulkTransfers,
    outbox: Outbox,
}

impl<H: Copy, S: Session> Peer<H, S> {
    pub fn new(config: PeerConfig, catalog: TemplateCatalog, session: S) -> Result<Self, AslClientError> {
        let local = session.local_peer().ok_or(AslClientError::NotConnected)?;
        info!("{} ready, master is {:?}", local, session.master());

        Ok(Self {
            objects: ObjectManager::new(local, &config, catalog),
            portals: PortalManager::new(),
            worlds: WorldManager::new(config.world_spacing),
            bulk: BulkTransfers::new(),
            outbox: Outbox::new(),
            session,
            local,
        })
    }

    // Session

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    pub fn is_master(&self) -> bool {
        self.session.is_master()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn objects(&self) -> &ObjectManager<H> {
        &self.objects
    }

    pub fn portals(&self) -> &PortalManager {
        &self.portals
    }

    pub fn worlds(&self) -> &WorldManager {
        &self.worlds
    }

    /// Tells the master this peer has entered the room, so it replays the
    /// scene. The master itself has nothing to catch up on.
    pub fn announce_join(&mut self) {
        if self.session.is_master() {
            debug!("{} is master, no scene to request", self.local);
            return;
        }
        self.outbox
            .send(AslEvent::Join, RaiseOptions::to(Receivers::Master));
        self.flush();
    }

    // Objects

    pub fn instantiate<W: SceneMut<H>>(&mut self, scene: &mut W, prefab: &str) -> Option<ObjectId> {
        self.instantiate_at(scene, prefab, &Transform::identity())
    }

    pub fn instantiate_at<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        prefab: &str,
        transform: &Transform,
    ) -> Option<ObjectId> {
        let ctx = self.context();
        let id = self
            .objects
            .instantiate_at(scene, &ctx, &mut self.outbox, prefab, transform);
        self.flush();
        id
    }

    pub fn instantiate_owned<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        prefab: &str,
        transform: &Transform,
    ) -> Option<ObjectId> {
        let ctx = self.context();
        let id = self
            .objects
            .instantiate_owned(scene, &ctx, &mut self.outbox, prefab, transform);
        self.flush();
        id
    }

    /// Destroys `(name, id)` everywhere. Returns whether a local copy existed.
    pub fn destroy<W: SceneMut<H>>(&mut self, scene: &mut W, name: &str, id: &ObjectId) -> bool {
        let ctx = self.context();
        let removed = self
            .objects
            .destroy(scene, &ctx, &mut self.outbox, name, id)
            .map(|entry| entry.id());
        if let Some(root) = removed {
            self.forget(&ctx, &root);
        }
        self.flush();
        removed.is_some()
    }

    /// Destroys a locally known object, looking its name up first
    pub fn destroy_object<W: SceneMut<H>>(&mut self, scene: &mut W, id: &ObjectId) -> bool {
        let Some(name) = self.objects.get(id).map(|entry| entry.name().to_string()) else {
            warn!("Cannot destroy {}: not in registry", id);
            return false;
        };
        self.destroy(scene, &name, id)
    }

    pub fn request_ownership(&mut self, id: &ObjectId) -> bool {
        let taken = self.objects.request_ownership(&mut self.outbox, id);
        self.flush();
        taken
    }

    pub fn restrict(&mut self, id: &ObjectId) -> bool {
        let ctx = self.context();
        let done = self.objects.restrict(&ctx, &mut self.outbox, id);
        self.flush();
        done
    }

    pub fn restrict_to_self(&mut self, id: &ObjectId) -> bool {
        let ctx = self.context();
        let done = self.objects.restrict_to_self(&ctx, &mut self.outbox, id);
        self.flush();
        done
    }

    pub fn restrict_ownership(&mut self, id: &ObjectId, whitelist: &[PeerId]) -> bool {
        let ctx = self.context();
        let done = self
            .objects
            .restrict_ownership(&ctx, &mut self.outbox, id, whitelist);
        self.flush();
        done
    }

    pub fn unrestrict(&mut self, id: &ObjectId) -> bool {
        let ctx = self.context();
        let done = self.objects.unrestrict(&ctx, &mut self.outbox, id);
        self.flush();
        done
    }

    pub fn whitelist(&mut self, id: &ObjectId, peers: &[PeerId]) -> bool {
        let ctx = self.context();
        let done = self.objects.whitelist(&ctx, &mut self.outbox, id, peers);
        self.flush();
        done
    }

    pub fn blacklist(&mut self, id: &ObjectId, peers: &[PeerId]) -> bool {
        let ctx = self.context();
        let done = self.objects.blacklist(&ctx, &mut self.outbox, id, peers);
        self.flush();
        done
    }

    pub fn force_sync_scene<R: SceneRef<H>>(&mut self, scene: &R, target: PeerId) -> usize {
        let ctx = self.context();
        let sent = self
            .objects
            .force_sync_scene(scene, &ctx, &mut self.outbox, target);
        self.flush();
        sent
    }

    // Portals

    /// Instantiates a portal owned by this peer and asks the master to
    /// register it
    pub fn make_portal<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        prefab: &str,
        transform: &Transform,
    ) -> Option<ObjectId> {
        let ctx = self.context();
        let id = self
            .objects
            .instantiate_owned(scene, &ctx, &mut self.outbox, prefab, transform)?;
        self.portals.request_register(&mut self.outbox, id);
        self.flush();
        Some(id)
    }

    pub fn request_register(&mut self, id: ObjectId) -> bool {
        let sent = self.portals.request_register(&mut self.outbox, id);
        self.flush();
        sent
    }

    pub fn request_unregister(&mut self, id: ObjectId) -> bool {
        let sent = self.portals.request_unregister(&mut self.outbox, id);
        self.flush();
        sent
    }

    pub fn request_link(&mut self, source: ObjectId, destination: ObjectId) -> bool {
        let sent = self
            .portals
            .request_link(&mut self.outbox, source, destination);
        self.flush();
        sent
    }

    pub fn request_link_by_name(&mut self, source: &str, destination: &str) -> bool {
        let sent = self.portals.request_link_by_name(
            &mut self.outbox,
            self.objects.registry(),
            source,
            destination,
        );
        self.flush();
        sent
    }

    pub fn request_unlink(&mut self, source: ObjectId) -> bool {
        let sent = self.portals.request_unlink(&mut self.outbox, source);
        self.flush();
        sent
    }

    // Worlds

    pub fn create_world<W: SceneMut<H>>(&mut self, scene: &mut W, prefab: &str) -> Option<ObjectId> {
        let ctx = self.context();
        let world = self
            .worlds
            .create_world(&mut self.objects, scene, &ctx, &mut self.outbox, prefab);
        self.flush();
        world
    }

    pub fn add_to_world<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        world: ObjectId,
        object: ObjectId,
    ) -> bool {
        let added = self
            .worlds
            .add_to_world(&self.objects, scene, &mut self.outbox, world, object);
        self.flush();
        added
    }

    // Bulk transfers

    pub fn start_bulk_transfer<R: Read + Send + 'static>(&mut self, key: &str, source: R) {
        self.bulk.start(key, source);
    }

    pub fn bulk_transfers_in_flight(&self) -> usize {
        self.bulk.in_flight()
    }

    /// Blocks until every bulk transfer has finished. Their results are
    /// reported by the next [`Peer::receive`].
    pub fn wait_bulk_transfers(&mut self) -> usize {
        self.bulk.wait_all(&mut self.outbox)
    }

    // Incoming

    /// Applies everything the session has delivered, then returns the events
    /// produced since the last call, local operations included
    pub fn receive<W: SceneMut<H>>(&mut self, scene: &mut W) -> PeerEvents {
        loop {
            match self.session.receive() {
                Ok(Some(message)) => self.handle_message(scene, message),
                Ok(None) => break,
                Err(err) => {
                    warn!("{} failed to receive: {}", self.local, err);
                    self.outbox.emit(PeerEvent::Error(err.into()));
                    break;
                }
            }
        }

        self.objects.expire_pending(Instant::now());
        self.bulk.poll(&mut self.outbox);
        self.flush();

        PeerEvents::new(self.outbox.take_events())
    }

    fn handle_message<W: SceneMut<H>>(&mut self, scene: &mut W, message: SessionMessage) {
        let ctx = self.context();
        match message {
            SessionMessage::Event { sender, event } => self.handle_event(scene, &ctx, sender, event),
            SessionMessage::PeerJoined(peer) => {
                info!("{} joined the room", peer);
                self.outbox.emit(PeerEvent::PeerJoined(peer));
            }
            SessionMessage::PeerLeft(peer) => {
                info!("{} left the room", peer);
                self.outbox.emit(PeerEvent::PeerLeft(peer));
                let removed = self
                    .objects
                    .peer_left(scene, &ctx, &mut self.outbox, peer);
                for entry in removed {
                    self.forget(&ctx, &entry.id());
                }
            }
            SessionMessage::MasterChanged(peer) => {
                info!("{} is now master", peer);
                self.outbox.emit(PeerEvent::MasterChanged(peer));
            }
        }
    }

    fn handle_event<W: SceneMut<H>>(
        &mut self,
        scene: &mut W,
        ctx: &RoomContext,
        sender: PeerId,
        event: AslEvent,
    ) {
        let out = &mut self.outbox;
        match event {
            AslEvent::Instantiate(payload) => {
                self.objects.receive_instantiate(scene, ctx, out, payload);
            }
            AslEvent::Destroy { name, id, .. } => {
                if let Some(entry) = self.objects.receive_destroy(scene, ctx, out, &name, &id) {
                    self.forget(ctx, &entry.id());
                }
            }
            AslEvent::OwnershipRestrictionChanged(payload) => {
                self.objects.receive_restrictions(ctx, out, payload);
            }
            AslEvent::OwnershipTransferred { id, owner, epoch } => {
                self.objects
                    .receive_transfer(ctx, out, sender, id, owner, epoch);
            }
            AslEvent::Join => {
                self.objects.receive_join(&*scene, ctx, out, sender);
            }
            AslEvent::SyncScene(payload) => {
                self.objects.receive_sync_scene(scene, ctx, out, payload);
            }
            AslEvent::Portal { phase, action } => {
                self.portals.receive(ctx, out, sender, phase, action);
            }
            AslEvent::World(action) => {
                self.worlds.receive(&self.objects, scene, out, action);
            }
        }
    }

    fn forget(&mut self, ctx: &RoomContext, id: &ObjectId) {
        self.portals.forget(ctx, &mut self.outbox, id);
        self.worlds.forget(id);
    }

    fn context(&self) -> RoomContext {
        RoomContext {
            local: self.local,
            master: self.session.master(),
            now: self.session.server_time(),
            instant: Instant::now(),
        }
    }

    fn flush(&mut self) {
        while let Some((event, options)) = self.outbox.pop_outgoing() {
            let name = event.name();
            if let Err(err) = self.session.raise_event(event, options) {
                warn!("{} failed to send {}: {}", self.local, name, err);
                self.outbox.emit(PeerEvent::Error(err.into()));
            }
        }
    }
}
