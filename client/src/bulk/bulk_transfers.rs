use std::{
    io::{self, Read},
    thread::{self, JoinHandle},
};

use log::{info, warn};

use crate::{events::PeerEvent, outbox::Outbox, AslClientError};

/// Large byte payloads (room meshes and the like) read on a dedicated thread
/// each, so the protocol tick never blocks on them. Finished transfers are
/// joined and handed back on the next poll.
#[derive(Default)]
pub struct BulkTransfers {
    running: Vec<(String, JoinHandle<io::Result<Vec<u8>>>)>,
}

impl BulkTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<R: Read + Send + 'static>(&mut self, key: &str, mut source: R) {
        let handle = thread::spawn(move || {
            let mut bytes = Vec::new();
            source.read_to_end(&mut bytes)?;
            Ok(bytes)
        });
        self.running.push((key.to_string(), handle));
    }

    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    /// Joins every finished transfer without waiting on unfinished ones.
    /// Returns how many completed.
    pub fn poll(&mut self, out: &mut Outbox) -> usize {
        let mut finished = Vec::new();
        let mut index = 0;
        while index < self.running.len() {
            if self.running[index].1.is_finished() {
                finished.push(self.running.swap_remove(index));
            } else {
                index += 1;
            }
        }

        let completed = finished.len();
        for (key, handle) in finished {
            out.emit(Self::collect(key, handle));
        }
        completed
    }

    /// Blocks until every transfer has finished
    pub fn wait_all(&mut self, out: &mut Outbox) -> usize {
        let completed = self.running.len();
        for (key, handle) in self.running.drain(..) {
            out.emit(Self::collect(key, handle));
        }
        completed
    }

    fn collect(key: String, handle: JoinHandle<io::Result<Vec<u8>>>) -> PeerEvent {
        match handle.join() {
            Ok(Ok(bytes)) => {
                info!("Bulk transfer `{}` finished: {} byte(s)", key, bytes.len());
                PeerEvent::BulkReceived { key, bytes }
            }
            Ok(Err(err)) => {
                warn!("Bulk transfer `{}` failed: {}", key, err);
                PeerEvent::Error(AslClientError::BulkTransferFailed {
                    key,
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                warn!("Bulk transfer `{}` panicked", key);
                PeerEvent::Error(AslClientError::BulkTransferFailed {
                    key,
                    reason: "reader thread panicked".to_string(),
                })
            }
        }
    }
}
