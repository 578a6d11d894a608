use std::sync::{Arc, Mutex, PoisonError};

use hashbrown::HashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::wire::{CodecError, Packet, compress};

/// Fan-out collaborator that hands published payloads to an owner's viewers.
pub trait Publisher: Send + Sync {
    fn publish(&self, owner: &str, payload: Arc<[u8]>);
}

/// Encode and gzip one record for publishing.
pub fn encode_payload(packet: &Packet) -> Result<Arc<[u8]>, CodecError> {
    Ok(compress(&packet.encode())?.into())
}

/// In-process publisher: one broadcast channel per owner.
pub struct BroadcastPublisher {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Arc<[u8]>>>>,
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Receive every payload published for `owner` from now on.
    pub fn subscribe(&self, owner: &str) -> broadcast::Receiver<Arc<[u8]>> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(owner.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn viewer_count(&self, owner: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.get(owner).map_or(0, |tx| tx.receiver_count())
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, owner: &str, payload: Arc<[u8]>) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = channels.get(owner) else {
            return;
        };
        if tx.send(payload).is_err() {
            // last viewer went away
            trace!(owner, "No viewers left, dropping channel");
            channels.remove(owner);
        }
    }
}
