use std::{collections::VecDeque, time::Instant};

use asl_shared::{AslEvent, PeerId, RaiseOptions, Timestamp};

use crate::events::PeerEvent;

/// Snapshot of the session state a protocol step runs against
#[derive(Clone, Copy, Debug)]
pub struct RoomContext {
    pub local: PeerId,
    pub master: Option<PeerId>,
    /// Session clock, stamped on outgoing events
    pub now: Timestamp,
    /// Local monotonic clock, used for expiry
    pub instant: Instant,
}

impl RoomContext {
    pub fn is_master(&self) -> bool {
        self.master == Some(self.local)
    }
}

/// Outgoing session events and local peer events, both in the order the
/// protocol produced them
#[derive(Default)]
pub struct Outbox {
    outgoing: VecDeque<(AslEvent, RaiseOptions)>,
    events: Vec<PeerEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, event: AslEvent, options: RaiseOptions) {
        self.outgoing.push_back((event, options));
    }

    pub fn emit(&mut self, event: PeerEvent) {
        self.events.push(event);
    }

    pub fn pop_outgoing(&mut self) -> Option<(AslEvent, RaiseOptions)> {
        self.outgoing.pop_front()
    }

    pub fn outgoing(&self) -> impl Iterator<Item = &(AslEvent, RaiseOptions)> {
        self.outgoing.iter()
    }

    pub fn events(&self) -> &[PeerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<PeerEvent> {
        std::mem::take(&mut self.events)
    }
}
