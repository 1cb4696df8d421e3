use std::collections::BTreeMap;

use fastrand::Rng;
use log::{debug, info};

use asl_shared::{AslEvent, Caching, PeerId, RaiseOptions, Receivers, SessionMessage};

use crate::{
    inbox::{Inbox, Lane},
    DeliveryOrder, RelayConfig, RelayError,
};

/// Shared state of one room: who is in it, who is master, and what every
/// peer has yet to receive
pub(crate) struct Room {
    config: RelayConfig,
    last_actor: u32,
    peers: BTreeMap<PeerId, Inbox>,
    master: Option<PeerId>,
    cache: Vec<(PeerId, AslEvent)>,
    rng: Rng,
}

impl Room {
    pub fn new(config: RelayConfig) -> Self {
        let rng = match config.delivery {
            DeliveryOrder::Interleaved { seed } => Rng::with_seed(seed),
            DeliveryOrder::Arrival => Rng::new(),
        };
        Self {
            config,
            last_actor: 0,
            peers: BTreeMap::new(),
            master: None,
            cache: Vec::new(),
            rng,
        }
    }

    pub fn master(&self) -> Option<PeerId> {
        self.master
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.keys().copied().collect()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn cached_events(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_for(&self, peer: &PeerId) -> usize {
        self.peers.get(peer).map(Inbox::len).unwrap_or(0)
    }

    /// Admits a new peer. Actor numbers start at 1 and are never reused; the
    /// first peer in an empty room becomes master.
    pub fn join(&mut self) -> Result<PeerId, RelayError> {
        if let Some(max) = self.config.max_peers {
            if self.peers.len() >= max {
                return Err(RelayError::RoomFull { max });
            }
        }

        self.last_actor += 1;
        let peer = PeerId::new(self.last_actor);

        let mut inbox = Inbox::new(self.config.delivery);
        for (sender, event) in &self.cache {
            inbox.push(
                Lane::Cache,
                SessionMessage::Event {
                    sender: *sender,
                    event: event.clone(),
                },
            );
        }
        for other in self.peers.values_mut() {
            other.push(Lane::Room, SessionMessage::PeerJoined(peer));
        }
        self.peers.insert(peer, inbox);

        if self.master.is_none() {
            self.master = Some(peer);
        }
        info!(
            "{} joined ({} cached event(s) replayed), master is {:?}",
            peer,
            self.cache.len(),
            self.master
        );
        Ok(peer)
    }

    /// Removes a peer. If it was master, the lowest remaining actor number
    /// takes over and everyone is told.
    pub fn leave(&mut self, peer: PeerId) -> Result<(), RelayError> {
        if self.peers.remove(&peer).is_none() {
            return Err(RelayError::UnknownPeer { peer });
        }
        for other in self.peers.values_mut() {
            other.push(Lane::Room, SessionMessage::PeerLeft(peer));
        }

        if self.master == Some(peer) {
            self.master = self.peers.keys().next().copied();
            if let Some(master) = self.master {
                info!("Master {} left, {} takes over", peer, master);
                for other in self.peers.values_mut() {
                    other.push(Lane::Room, SessionMessage::MasterChanged(master));
                }
            }
        }
        Ok(())
    }

    pub fn route(
        &mut self,
        sender: PeerId,
        event: AslEvent,
        options: RaiseOptions,
    ) -> Result<(), RelayError> {
        if !self.contains(&sender) {
            return Err(RelayError::UnknownPeer { peer: sender });
        }

        let receivers: Vec<PeerId> = match &options.receivers {
            Receivers::Others => self
                .peers
                .keys()
                .copied()
                .filter(|peer| *peer != sender)
                .collect(),
            Receivers::All => self.peers(),
            Receivers::Master => self.master.into_iter().collect(),
            Receivers::Targets(targets) => targets
                .iter()
                .copied()
                .filter(|target| {
                    let present = self.contains(target);
                    if !present {
                        debug!("Dropping {} for absent {}", event.name(), target);
                    }
                    present
                })
                .collect(),
        };

        for receiver in receivers {
            if let Some(inbox) = self.peers.get_mut(&receiver) {
                inbox.push(
                    Lane::Peer(sender),
                    SessionMessage::Event {
                        sender,
                        event: event.clone(),
                    },
                );
            }
        }

        if options.caching == Caching::AddToRoomCache {
            self.cache.push((sender, event));
        }
        Ok(())
    }

    pub fn next_for(&mut self, peer: PeerId) -> Result<Option<SessionMessage>, RelayError> {
        let delivery = self.config.delivery;
        let inbox = self
            .peers
            .get_mut(&peer)
            .ok_or(RelayError::UnknownPeer { peer })?;
        Ok(inbox.pop(delivery, &mut self.rng))
    }
}
