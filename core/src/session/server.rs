use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parsecast_types::ServerConfig;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::SessionState;
use crate::storage::EncounterArchive;
use crate::wire::Packet;

use super::keys::OwnerDirectory;
use super::publisher::Publisher;
use super::registry::{SessionHandle, SessionRegistry};
use super::task::SessionTask;
use super::SessionError;

/// Largest UDP payload.
const MAX_DATAGRAM: usize = 65_535;

/// What the receive loop did with one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Delivered,
    SessionCreated { owner: String },
}

/// Everything the receive loop needs to route datagrams and spawn sessions.
#[derive(Clone)]
pub struct ServerContext {
    config: Arc<ServerConfig>,
    registry: SessionRegistry,
    publisher: Arc<dyn Publisher>,
    directory: Arc<dyn OwnerDirectory>,
    archive: Option<EncounterArchive>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        publisher: Arc<dyn Publisher>,
        directory: Arc<dyn OwnerDirectory>,
        archive: Option<EncounterArchive>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: SessionRegistry::new(),
            publisher,
            directory,
            archive,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Decode one datagram and hand it to its session.
    ///
    /// A handshake from an unknown address creates the session; anything else
    /// from an unknown address is an error.
    pub async fn route(&self, addr: SocketAddr, datagram: &[u8]) -> Result<Routed, SessionError> {
        let packet = Packet::decode(datagram, &self.config.protocol_versions())?;

        if let Some(handle) = self.registry.get(addr).await {
            handle.try_deliver(packet)?;
            return Ok(Routed::Delivered);
        }

        let Packet::Session(handshake) = packet else {
            return Err(SessionError::UnknownSession { addr });
        };
        let owner = self
            .directory
            .resolve(&handshake.upload_key)
            .ok_or(SessionError::UnknownKey)?;
        self.spawn_session(&owner, addr).await;
        Ok(Routed::SessionCreated { owner })
    }

    /// Create a session for `owner` at `addr` and start its task.
    pub async fn spawn_session(&self, owner: &str, addr: SocketAddr) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(self.config.session.inbox_capacity.max(1));
        let handle: SessionHandle = self.registry.insert(owner, addr, tx).await;

        let task = SessionTask::new(
            &handle,
            rx,
            SessionState::new(&self.config),
            self.registry.clone(),
            self.publisher.clone(),
            self.archive.clone(),
            Duration::from_millis(self.config.publish_interval_ms),
            Duration::from_millis(self.config.session.inactivity_timeout_ms),
        );
        tokio::spawn(task.run())
    }
}

pub async fn bind(port: u16) -> Result<UdpSocket, SessionError> {
    UdpSocket::bind(("0.0.0.0", port))
        .await
        .map_err(|source| SessionError::Bind { port, source })
}

/// The UDP receive loop. Only decodes and routes; never waits on a session.
pub async fn serve(
    socket: UdpSocket,
    ctx: ServerContext,
    shutdown: impl Future<Output = ()>,
) -> Result<(), SessionError> {
    if let Ok(local) = socket.local_addr() {
        info!(addr = %local, "Listening for telemetry");
    }
    let mut buf = vec![0u8; MAX_DATAGRAM];
    tokio::pin!(shutdown);

    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buf) => received,
            _ = &mut shutdown => {
                info!("Receive loop shutting down");
                return Ok(());
            }
        };

        let (len, addr) = match received {
            Ok(received) => received,
            // ICMP errors surface here on some platforms; keep going
            Err(err) => {
                warn!(error = %err, "UDP receive failed");
                continue;
            }
        };

        match ctx.route(addr, &buf[..len]).await {
            Ok(Routed::Delivered) => {}
            Ok(Routed::SessionCreated { owner }) => {
                info!(%addr, owner = %owner, "Session created");
            }
            Err(err @ (SessionError::UnknownKey | SessionError::InboxFull { .. })) => {
                warn!(%addr, error = %err, "Dropping datagram");
            }
            Err(err) => debug!(%addr, error = %err, "Dropping datagram"),
        }
    }
}
