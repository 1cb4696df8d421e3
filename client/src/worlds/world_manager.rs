use std::collections::BTreeMap;

use log::{info, warn};

use asl_shared::{
    AslEvent, ObjectId, RaiseOptions, Receivers, SceneMut, Transform, Vector3, WorldAction,
};

use crate::{
    events::PeerEvent,
    objects::ObjectManager,
    outbox::{Outbox, RoomContext},
};

/// Groups replicated objects under world objects. Worlds are stacked
/// vertically, `spacing` apart, in creation order.
pub struct WorldManager {
    worlds: BTreeMap<ObjectId, Vec<ObjectId>>,
    spacing: f32,
}

impl WorldManager {
    pub fn new(spacing: f32) -> Self {
        Self {
            worlds: BTreeMap::new(),
            spacing,
        }
    }

    pub fn is_world(&self, id: &ObjectId) -> bool {
        self.worlds.contains_key(id)
    }

    pub fn members(&self, world: &ObjectId) -> Option<&[ObjectId]> {
        self.worlds.get(world).map(Vec::as_slice)
    }

    pub fn world_ids(&self) -> Vec<ObjectId> {
        self.worlds.keys().copied().collect()
    }

    pub fn world_by_name<H: Copy>(&self, objects: &ObjectManager<H>, name: &str) -> Option<ObjectId> {
        objects
            .registry()
            .get_all(name)
            .into_iter()
            .map(|entry| entry.id())
            .find(|id| self.is_world(id))
    }

    pub fn world_of(&self, object: &ObjectId) -> Option<ObjectId> {
        self.worlds
            .iter()
            .find(|(_, members)| members.contains(object))
            .map(|(world, _)| *world)
    }

    /// Instantiates an owned world object above the existing ones and
    /// announces it as a world
    pub fn create_world<H: Copy, W: SceneMut<H>>(
        &mut self,
        objects: &mut ObjectManager<H>,
        scene: &mut W,
        ctx: &RoomContext,
        out: &mut Outbox,
        prefab: &str,
    ) -> Option<ObjectId> {
        let height = self.worlds.len() as f32 * self.spacing;
        let transform = Transform::from_position(Vector3::up().scaled(height));
        let world = objects.instantiate_owned(scene, ctx, out, prefab, &transform)?;

        self.worlds.insert(world, Vec::new());
        out.send(
            AslEvent::World(WorldAction::Add(world)),
            RaiseOptions::to(Receivers::Others),
        );
        out.emit(PeerEvent::WorldAdded(world));
        Some(world)
    }

    /// Re-parents `object` under `world` and announces the grouping
    pub fn add_to_world<H: Copy, W: SceneMut<H>>(
        &mut self,
        objects: &ObjectManager<H>,
        scene: &mut W,
        out: &mut Outbox,
        world: ObjectId,
        object: ObjectId,
    ) -> bool {
        if !self.attach(objects, scene, out, world, object) {
            return false;
        }
        out.send(
            AslEvent::World(WorldAction::AddTo { world, object }),
            RaiseOptions::to(Receivers::Others),
        );
        true
    }

    pub fn receive<H: Copy, W: SceneMut<H>>(
        &mut self,
        objects: &ObjectManager<H>,
        scene: &mut W,
        out: &mut Outbox,
        action: WorldAction,
    ) {
        match action {
            WorldAction::Add(world) => {
                if self.worlds.insert(world, Vec::new()).is_none() {
                    out.emit(PeerEvent::WorldAdded(world));
                }
            }
            WorldAction::AddTo { world, object } => {
                self.attach(objects, scene, out, world, object);
            }
        }
    }

    fn attach<H: Copy, W: SceneMut<H>>(
        &mut self,
        objects: &ObjectManager<H>,
        scene: &mut W,
        out: &mut Outbox,
        world: ObjectId,
        object: ObjectId,
    ) -> bool {
        let (Some(world_handle), Some(object_handle)) =
            (objects.handle_of(&world), objects.handle_of(&object))
        else {
            warn!("Cannot add {} to world {}: object not found", object, world);
            return false;
        };
        if !self.worlds.contains_key(&world) {
            warn!("Cannot add {} to {}: not a world", object, world);
            return false;
        }

        scene.set_parent(&object_handle, Some(&world_handle));
        for (id, members) in self.worlds.iter_mut() {
            if *id == world {
                if !members.contains(&object) {
                    members.push(object);
                }
            } else {
                members.retain(|member| *member != object);
            }
        }
        info!("{} added to world {}", object, world);
        out.emit(PeerEvent::AddedToWorld { world, object });
        true
    }

    /// Drops a destroyed object, whether it was a world or a member
    pub fn forget(&mut self, id: &ObjectId) {
        self.worlds.remove(id);
        for members in self.worlds.values_mut() {
            members.retain(|member| member != id);
        }
    }
}
