mod error;
mod session;

pub use error::TransportError;
pub use session::{Caching, RaiseOptions, Receivers, Session, SessionMessage};
