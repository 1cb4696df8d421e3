//! # ASL Shared
//! Common functionality shared between asl-client & asl-server crates: object
//! ids, the ownership state machine, the object registry, template catalogs
//! and the events peers exchange over a session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod events;
mod ids;
mod object;
mod scene;
mod transform;
mod transport;
mod types;

pub use events::{
    ArbitrationPhase, AslEvent, InstantiatePayload, PortalAction, RestrictionPayload,
    SyncScenePayload, WorldAction,
};
pub use ids::{error::IdError, id_allocator::IdAllocator, id_space::IdSpace, object_id::ObjectId};
pub use object::{
    error::OwnershipError,
    ownership::{OwnershipRecord, OwnershipSnapshot, TakeOutcome, TransferPolicy},
    registry::{ObjectEntry, ObjectRegistry},
    template::{Template, TemplateCatalog, TemplateFolder, TemplateKind},
};
pub use scene::{SceneMut, SceneRef};
pub use transform::{Quat, Transform, Vector3};
pub use transport::{Caching, RaiseOptions, Receivers, Session, SessionMessage, TransportError};
pub use types::{Owner, PeerId, Timestamp};
