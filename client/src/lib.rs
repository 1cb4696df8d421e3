//! # ASL Client
//! The per-peer side of the ASL object protocol: instantiates and destroys
//! replicated objects, arbitrates their ownership, keeps late joiners in sync
//! and routes portal changes through the master.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bulk;
mod error;
mod events;
mod objects;
mod outbox;
mod peer;
mod peer_config;
mod portals;
mod worlds;

pub use bulk::BulkTransfers;
pub use error::AslClientError;
pub use events::{PeerEvent, PeerEvents};
pub use objects::{ObjectManager, PendingChange, PendingChanges};
pub use outbox::{Outbox, RoomContext};
pub use peer::Peer;
pub use peer_config::PeerConfig;
pub use portals::PortalManager;
pub use worlds::WorldManager;
