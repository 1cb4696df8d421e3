use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::{
    object::{ownership::OwnershipRecord, template::TemplateKind},
    ObjectId, Timestamp,
};

/// A replicated object as known to the local peer
#[derive(Clone, Debug)]
pub struct ObjectEntry<H> {
    name: String,
    ids: Vec<ObjectId>,
    handle: H,
    prefab: String,
    kind: TemplateKind,
    ownership: OwnershipRecord,
    instantiated_at: Timestamp,
}

impl<H: Copy> ObjectEntry<H> {
    /// `ids` must not be empty; its first element identifies the object.
    pub fn new(
        name: impl Into<String>,
        ids: Vec<ObjectId>,
        handle: H,
        prefab: impl Into<String>,
        kind: TemplateKind,
    ) -> Self {
        Self {
            name: name.into(),
            ids,
            handle,
            prefab: prefab.into(),
            kind,
            ownership: OwnershipRecord::new(),
            instantiated_at: Timestamp::default(),
        }
    }

    pub fn with_ownership(mut self, ownership: OwnershipRecord) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ObjectId {
        self.ids[0]
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn prefab(&self) -> &str {
        &self.prefab
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn ownership(&self) -> &OwnershipRecord {
        &self.ownership
    }

    pub fn ownership_mut(&mut self) -> &mut OwnershipRecord {
        &mut self.ownership
    }

    pub fn instantiated_at(&self) -> Timestamp {
        self.instantiated_at
    }
}

/// Local table of every live replicated object.
///
/// Nothing here fails: looking up or removing an absent object yields `None`,
/// since an object may be destroyed by another peer between any two calls.
/// Part ids resolve to the entry of the object they belong to.
pub struct ObjectRegistry<H> {
    entries: BTreeMap<ObjectId, ObjectEntry<H>>,
    parts: HashMap<ObjectId, ObjectId>,
    names: HashMap<String, Vec<ObjectId>>,
    last_modified: Timestamp,
}

impl<H: Copy> Default for ObjectRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy> ObjectRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            parts: HashMap::new(),
            names: HashMap::new(),
            last_modified: Timestamp::default(),
        }
    }

    /// Inserts `entry`, replacing any object with the same id. Returns the
    /// replaced entry.
    pub fn add(&mut self, mut entry: ObjectEntry<H>, now: Timestamp) -> Option<ObjectEntry<H>> {
        let id = entry.id();
        let replaced = self.remove(&id);
        if replaced.is_some() {
            debug!("Replacing registry entry for {}", id);
        }

        entry.instantiated_at = now;
        for part in entry.ids.iter().skip(1) {
            self.parts.insert(*part, id);
        }
        self.names.entry(entry.name.clone()).or_default().push(id);
        self.entries.insert(id, entry);
        self.last_modified = now;

        replaced
    }

    /// Removes the object `id` belongs to. Callers stamp the removal with
    /// [`Self::touch`].
    pub fn remove(&mut self, id: &ObjectId) -> Option<ObjectEntry<H>> {
        let root = self.root_of(id)?;
        let entry = self.entries.remove(&root)?;

        for part in entry.ids.iter().skip(1) {
            self.parts.remove(part);
        }
        if let Some(ids) = self.names.get_mut(&entry.name) {
            ids.retain(|other| *other != root);
            if ids.is_empty() {
                self.names.remove(&entry.name);
            }
        }

        Some(entry)
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_modified = now;
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.root_of(id).is_some()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&ObjectEntry<H>> {
        let root = self.root_of(id)?;
        self.entries.get(&root)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut ObjectEntry<H>> {
        let root = self.root_of(id)?;
        self.entries.get_mut(&root)
    }

    /// Lookup by `(name, id)`, the key destruction travels under
    pub fn find(&self, name: &str, id: &ObjectId) -> Option<&ObjectEntry<H>> {
        self.get(id).filter(|entry| entry.name == name)
    }

    /// Most recently added live object with this display name
    pub fn get_by_name(&self, name: &str) -> Option<&ObjectEntry<H>> {
        let id = self.names.get(name)?.last()?;
        self.entries.get(id)
    }

    pub fn get_all(&self, name: &str) -> Vec<&ObjectEntry<H>> {
        self.names
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.entries.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn prefab_of(&self, id: &ObjectId) -> Option<&str> {
        self.get(id).map(|entry| entry.prefab())
    }

    pub fn find_by_handle(&self, handle: &H) -> Option<&ObjectEntry<H>>
    where
        H: PartialEq,
    {
        self.entries.values().find(|entry| entry.handle == *handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }

    /// Entries ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &ObjectEntry<H>> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ObjectEntry<H>> {
        self.entries.values_mut()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.entries.keys().copied().collect()
    }

    fn root_of(&self, id: &ObjectId) -> Option<ObjectId> {
        if self.entries.contains_key(id) {
            return Some(*id);
        }
        self.parts.get(id).copied()
    }
}
