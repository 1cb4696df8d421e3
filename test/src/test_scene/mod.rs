//! Minimal scene graph for protocol tests: a flat map of nodes with optional
//! parents
use std::collections::BTreeMap;

use asl_shared::{SceneMut, SceneRef, Template, Transform};

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct TestHandle(u32);

impl TestHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub template: String,
    pub parts: usize,
    pub name: String,
    pub transform: Transform,
    pub parent: Option<TestHandle>,
}

#[derive(Default)]
pub struct TestScene {
    next: u32,
    nodes: BTreeMap<TestHandle, SceneNode>,
    spawned: usize,
    despawned: usize,
}

impl TestScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: &TestHandle) -> Option<&SceneNode> {
        self.nodes.get(handle)
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.nodes.values().filter(|node| node.name == name).count()
    }

    /// Total spawns over the scene's lifetime, including despawned nodes
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    pub fn despawned(&self) -> usize {
        self.despawned
    }
}

impl SceneRef<TestHandle> for TestScene {
    fn has(&self, handle: &TestHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    fn transform(&self, handle: &TestHandle) -> Option<Transform> {
        self.nodes.get(handle).map(|node| node.transform)
    }
}

impl SceneMut<TestHandle> for TestScene {
    fn spawn(&mut self, template: &Template, name: &str, transform: &Transform) -> TestHandle {
        self.next += 1;
        self.spawned += 1;
        let handle = TestHandle(self.next);
        self.nodes.insert(
            handle,
            SceneNode {
                template: template.tag().to_string(),
                parts: template.parts(),
                name: name.to_string(),
                transform: *transform,
                parent: None,
            },
        );
        handle
    }

    fn despawn(&mut self, handle: &TestHandle) {
        if self.nodes.remove(handle).is_some() {
            self.despawned += 1;
        }
        for node in self.nodes.values_mut() {
            if node.parent == Some(*handle) {
                node.parent = None;
            }
        }
    }

    fn set_transform(&mut self, handle: &TestHandle, transform: &Transform) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform = *transform;
        }
    }

    fn set_parent(&mut self, handle: &TestHandle, parent: Option<&TestHandle>) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.parent = parent.copied();
        }
    }
}
