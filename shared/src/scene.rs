use crate::{object::template::Template, Transform};

/// Read access to the engine's scene graph
pub trait SceneRef<H> {
    fn has(&self, handle: &H) -> bool;

    fn transform(&self, handle: &H) -> Option<Transform>;
}

/// Mutable access to the engine's scene graph. The protocol never touches
/// engine objects except through this trait.
pub trait SceneMut<H>: SceneRef<H> {
    /// Builds an instance of `template`, returning the handle of its root
    fn spawn(&mut self, template: &Template, name: &str, transform: &Transform) -> H;

    fn despawn(&mut self, handle: &H);

    fn set_transform(&mut self, handle: &H, transform: &Transform);

    /// Re-parents `handle`; `None` moves it to the scene root
    fn set_parent(&mut self, handle: &H, parent: Option<&H>);
}
