use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use log::{info, warn};

use asl_shared::{
    AslEvent, PeerId, RaiseOptions, Session, SessionMessage, Timestamp, TransportError,
};

use crate::{room::Room, RelayConfig, RelayError};

/// In-process stand-in for the room server every peer connects through.
/// Cloning a `Relay` shares the same room.
#[derive(Clone)]
pub struct Relay {
    room: Arc<Mutex<Room>>,
    started: Instant,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            room: Arc::new(Mutex::new(Room::new(config))),
            started: Instant::now(),
        }
    }

    /// Joins the room as a new peer
    pub fn connect(&self) -> Result<RelaySession, RelayError> {
        let peer = self.lock()?.join()?;
        Ok(RelaySession {
            peer: Some(peer),
            room: self.room.clone(),
            started: self.started,
        })
    }

    /// Removes `peer` from the room as if its connection dropped
    pub fn disconnect(&self, peer: PeerId) -> Result<(), RelayError> {
        self.lock()?.leave(peer)
    }

    pub fn master(&self) -> Option<PeerId> {
        self.lock().ok().and_then(|room| room.master())
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.lock().map(|room| room.peers()).unwrap_or_default()
    }

    pub fn cached_events(&self) -> usize {
        self.lock().map(|room| room.cached_events()).unwrap_or(0)
    }

    /// Messages queued for `peer` and not yet received
    pub fn pending_for(&self, peer: &PeerId) -> usize {
        self.lock().map(|room| room.pending_for(peer)).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Room>, RelayError> {
        self.room.lock().map_err(|_| RelayError::LockPoisoned)
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

/// One peer's connection to a [`Relay`]
pub struct RelaySession {
    peer: Option<PeerId>,
    room: Arc<Mutex<Room>>,
    started: Instant,
}

impl RelaySession {
    /// Leaves the room. Further sends and receives fail with
    /// [`TransportError::NotConnected`].
    pub fn leave(&mut self) -> Result<(), RelayError> {
        let Some(peer) = self.peer.take() else {
            return Ok(());
        };
        info!("{} leaving the room", peer);
        self.lock()?.leave(peer)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Room>, RelayError> {
        self.room.lock().map_err(|_| RelayError::LockPoisoned)
    }

    /// Connected actor number, or `NotConnected` if this session left, or was
    /// dropped by the relay
    fn connected_peer(&self, room: &Room) -> Result<PeerId, TransportError> {
        match self.peer {
            Some(peer) if room.contains(&peer) => Ok(peer),
            _ => Err(TransportError::NotConnected),
        }
    }
}

impl Session for RelaySession {
    fn local_peer(&self) -> Option<PeerId> {
        self.peer
    }

    fn master(&self) -> Option<PeerId> {
        match self.lock() {
            Ok(room) => room.master(),
            Err(err) => {
                warn!("Unable to read master: {}", err);
                None
            }
        }
    }

    fn server_time(&self) -> Timestamp {
        Timestamp::from_millis(self.started.elapsed().as_millis() as u64)
    }

    fn raise_event(&mut self, event: AslEvent, options: RaiseOptions) -> Result<(), TransportError> {
        let name = event.name();
        let mut room = self.lock().map_err(|err| TransportError::SendFailed {
            event: name,
            reason: err.to_string(),
        })?;
        let sender = self.connected_peer(&room)?;

        room.route(sender, event, options)
            .map_err(|err| TransportError::SendFailed {
                event: name,
                reason: err.to_string(),
            })
    }

    fn receive(&mut self) -> Result<Option<SessionMessage>, TransportError> {
        let mut room = self.lock().map_err(|err| TransportError::ReceiveFailed {
            reason: err.to_string(),
        })?;
        let peer = self.connected_peer(&room)?;

        room.next_for(peer)
            .map_err(|err| TransportError::ReceiveFailed {
                reason: err.to_string(),
            })
    }
}
