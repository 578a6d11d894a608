use std::net::SocketAddr;
use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::wire::Packet;

use super::SessionError;

/// Cheap handle to a running session task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub owner: String,
    pub addr: SocketAddr,
    /// Distinguishes a session from a later one at the same address.
    pub generation: u64,
    inbox: mpsc::Sender<Packet>,
}

impl SessionHandle {
    /// Queue a packet without waiting. A full inbox drops the packet.
    pub fn try_deliver(&self, packet: Packet) -> Result<(), SessionError> {
        self.inbox.try_send(packet).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SessionError::InboxFull { addr: self.addr },
            mpsc::error::TrySendError::Closed(_) => SessionError::InboxClosed { addr: self.addr },
        })
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_addr: HashMap<SocketAddr, SessionHandle>,
    by_owner: HashMap<String, SocketAddr>,
    next_generation: u64,
}

impl RegistryInner {
    fn detach(&mut self, addr: SocketAddr) -> Option<SessionHandle> {
        let handle = self.by_addr.remove(&addr)?;
        if self.by_owner.get(&handle.owner) == Some(&addr) {
            self.by_owner.remove(&handle.owner);
        }
        Some(handle)
    }
}

/// Address -> session and owner -> address, shared by the receive loop and
/// every session task. All access goes through one lock.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, addr: SocketAddr) -> Option<SessionHandle> {
        self.inner.lock().await.by_addr.get(&addr).cloned()
    }

    pub async fn by_owner(&self, owner: &str) -> Option<SessionHandle> {
        let inner = self.inner.lock().await;
        let addr = inner.by_owner.get(owner)?;
        inner.by_addr.get(addr).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_addr.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Register a new session. Any session already at `addr`, or already
    /// owned by `owner` elsewhere, is detached; its task sees a closed inbox.
    pub async fn insert(
        &self,
        owner: &str,
        addr: SocketAddr,
        inbox: mpsc::Sender<Packet>,
    ) -> SessionHandle {
        let mut inner = self.inner.lock().await;

        if let Some(old) = inner.detach(addr) {
            debug!(%addr, owner = %old.owner, "Replacing session at address");
        }
        if let Some(&old_addr) = inner.by_owner.get(owner)
            && inner.detach(old_addr).is_some()
        {
            info!(owner, from = %old_addr, to = %addr, "Owner moved to a new address");
        }

        inner.next_generation += 1;
        let handle = SessionHandle {
            owner: owner.to_string(),
            addr,
            generation: inner.next_generation,
            inbox,
        };
        inner.by_addr.insert(addr, handle.clone());
        inner.by_owner.insert(owner.to_string(), addr);
        handle
    }

    /// Remove the session at `addr` if it is still `generation`.
    pub async fn remove(&self, addr: SocketAddr, generation: u64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.by_addr.get(&addr) {
            Some(handle) if handle.generation == generation => inner.detach(addr).is_some(),
            _ => false,
        }
    }
}
