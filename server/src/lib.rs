//! # ASL Server
//! An in-process room relay implementing the session contract ASL peers run
//! on: actor numbering, master election and hand-off, receiver groups, a room
//! event cache replayed to late joiners and per-sender ordered delivery.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod inbox;
mod relay;
mod relay_config;
mod room;

pub use error::RelayError;
pub use relay::{Relay, RelaySession};
pub use relay_config::{DeliveryOrder, RelayConfig};
