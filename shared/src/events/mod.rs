mod asl_event;
mod payload;

pub use asl_event::{ArbitrationPhase, AslEvent, PortalAction, WorldAction};
pub use payload::{InstantiatePayload, RestrictionPayload, SyncScenePayload};
