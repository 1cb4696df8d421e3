mod object_manager;
mod pending_changes;

pub use object_manager::ObjectManager;
pub use pending_changes::{PendingChange, PendingChanges};
