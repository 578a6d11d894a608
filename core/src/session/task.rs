use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::state::{FinishedEncounter, Outbox, SessionState};
use crate::storage::EncounterArchive;
use crate::wire::Packet;

use super::SessionRegistry;
use super::publisher::{Publisher, encode_payload};
use super::registry::SessionHandle;

enum Wake {
    Packet(Option<Packet>),
    Tick,
}

/// The per-session task. Owns the session's state exclusively.
pub struct SessionTask {
    owner: String,
    addr: SocketAddr,
    generation: u64,
    inbox: mpsc::Receiver<Packet>,
    state: SessionState,
    registry: SessionRegistry,
    publisher: Arc<dyn Publisher>,
    archive: Option<EncounterArchive>,
    publish_interval: Duration,
    inactivity_timeout: Duration,
    /// Wall clock at `started`; `now()` advances with the tokio clock.
    started_utc: DateTime<Utc>,
    started: Instant,
    pending_writes: Vec<JoinHandle<()>>,
}

impl SessionTask {
    pub fn new(
        handle: &SessionHandle,
        inbox: mpsc::Receiver<Packet>,
        state: SessionState,
        registry: SessionRegistry,
        publisher: Arc<dyn Publisher>,
        archive: Option<EncounterArchive>,
        publish_interval: Duration,
        inactivity_timeout: Duration,
    ) -> Self {
        Self {
            owner: handle.owner.clone(),
            addr: handle.addr,
            generation: handle.generation,
            inbox,
            state,
            registry,
            publisher,
            archive,
            publish_interval: publish_interval.max(Duration::from_millis(1)),
            inactivity_timeout,
            started_utc: Utc::now(),
            started: Instant::now(),
            pending_writes: Vec::new(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.started_utc
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Run until the inbox closes or the source goes quiet, then deregister.
    pub async fn run(mut self) {
        info!(owner = %self.owner, addr = %self.addr, "Session started");

        let mut ticker = tokio::time::interval(self.publish_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_packet = Instant::now();

        let reason = loop {
            let wake = tokio::select! {
                packet = self.inbox.recv() => Wake::Packet(packet),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Packet(Some(packet)) => {
                    last_packet = Instant::now();
                    let now = self.now();
                    self.state.apply(packet, now);
                }
                Wake::Packet(None) => break "replaced",
                Wake::Tick => {
                    self.publish_cycle();
                    if last_packet.elapsed() >= self.inactivity_timeout {
                        break "inactive";
                    }
                }
            }
        };

        // flush whatever the last packets produced
        self.publish_cycle();

        self.registry.remove(self.addr, self.generation).await;
        for write in self.pending_writes.drain(..) {
            if let Err(err) = write.await {
                warn!(error = %err, "Archive write task failed");
            }
        }
        info!(owner = %self.owner, addr = %self.addr, reason, "Session stopped");
    }

    fn publish_cycle(&mut self) {
        let now = self.now();
        let outbox = self.state.tick(now);
        self.publish(&outbox);
        self.persist(outbox.finished);
        self.pending_writes.retain(|write| !write.is_finished());
    }

    fn publish(&self, outbox: &Outbox) {
        for packet in outbox.packets() {
            match encode_payload(&packet) {
                Ok(payload) => self.publisher.publish(&self.owner, payload),
                Err(err) => warn!(owner = %self.owner, kind = packet.kind(), error = %err, "Failed to encode record"),
            }
        }
    }

    fn persist(&mut self, finished: Vec<FinishedEncounter>) {
        let Some(archive) = &self.archive else {
            return;
        };
        for encounter in finished {
            let archive = archive.clone();
            let owner = self.owner.clone();
            self.pending_writes.push(tokio::task::spawn_blocking(move || {
                match archive.write(&owner, &encounter) {
                    Ok(dir) => debug!(path = %dir.display(), "Encounter archived"),
                    Err(err) => warn!(
                        owner = %owner,
                        encounter_id = %encounter.encounter.id,
                        error = %err,
                        "Failed to archive encounter"
                    ),
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use parsecast_types::ServerConfig;

    use crate::encounter::EncounterOutcome;
    use crate::session::{BroadcastPublisher, ConfigKeyDirectory, ServerContext};
    use crate::storage::owner_dir_name;
    use crate::wire::{FlagRecord, LogLineRecord, decompress};

    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn config(inactivity_ms: u64) -> ServerConfig {
        let mut config = ServerConfig {
            dev_mode: true,
            publish_interval_ms: 10,
            ..ServerConfig::default()
        };
        config.session.inactivity_timeout_ms = inactivity_ms;
        config.timings.wipe_grace_ms = 0;
        config
    }

    fn context(
        config: ServerConfig,
        publisher: Arc<BroadcastPublisher>,
        archive: Option<EncounterArchive>,
    ) -> ServerContext {
        let directory = Arc::new(ConfigKeyDirectory::from_config(&config));
        ServerContext::new(config, publisher, directory, archive)
    }

    fn line(secs: i64, body: &str) -> Packet {
        let base = Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap();
        Packet::LogLine(LogLineRecord {
            encounter_id: String::new(),
            time: base + TimeDelta::seconds(secs),
            raw: format!("[21:00:00.000] {body}"),
        })
    }

    async fn finish(task: JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("session task stops")
            .unwrap();
    }

    #[tokio::test]
    async fn test_quiet_session_removes_itself() {
        let ctx = context(config(50), Arc::new(BroadcastPublisher::default()), None);
        let task = ctx.spawn_session("alice", addr(1)).await;
        assert_eq!(ctx.registry().len().await, 1);

        finish(task).await;
        assert!(ctx.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_finished_encounter_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EncounterArchive::new(dir.path());
        let ctx = context(
            config(300),
            Arc::new(BroadcastPublisher::default()),
            Some(archive.clone()),
        );
        let task = ctx.spawn_session("alice", addr(1)).await;
        let handle = ctx.registry().get(addr(1)).await.unwrap();

        for packet in [
            line(-5, "00:FFFF:Alpha:Balmung"),
            line(0, "15:10000001:Alpha:2E:Fire:40000001:Ifrit:3:03E80000"),
            line(20, "15:10000001:Alpha:2E:Fire:40000001:Ifrit:3:03E80000"),
            line(21, "19:Ifrit was defeated by Alpha."),
        ] {
            handle.try_deliver(packet).unwrap();
        }
        drop(handle);

        // exits on inactivity once the pending write has landed
        finish(task).await;

        let owner_dir = dir.path().join(owner_dir_name("alice"));
        let entries: Vec<_> = std::fs::read_dir(&owner_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);

        let loaded = EncounterArchive::load(&entries[0]).unwrap();
        assert_eq!(loaded.encounter.outcome, EncounterOutcome::Clear);
        assert!(!loaded.encounter.active);
        assert_eq!(loaded.log_lines.len(), 4);
    }

    #[tokio::test]
    async fn test_replaced_session_flushes_and_stops() {
        let publisher = Arc::new(BroadcastPublisher::default());
        let mut viewer = publisher.subscribe("alice");
        let ctx = context(config(60_000), publisher.clone(), None);

        let old_task = ctx.spawn_session("alice", addr(1)).await;
        let flag = Packet::Flag(FlagRecord {
            name: "logging".into(),
            value: true,
        });
        ctx.registry()
            .get(addr(1))
            .await
            .unwrap()
            .try_deliver(flag.clone())
            .unwrap();

        let new_task = ctx.spawn_session("alice", addr(2)).await;
        finish(old_task).await;

        // the stale generation must not evict the newer session
        assert_eq!(ctx.registry().by_owner("alice").await.unwrap().addr, addr(2));
        assert!(ctx.registry().get(addr(1)).await.is_none());

        let mut published = Vec::new();
        while let Ok(payload) = viewer.try_recv() {
            published.push(Packet::decode(&decompress(&payload).unwrap(), &(1..=1)).unwrap());
        }
        assert!(published.contains(&flag));

        new_task.abort();
    }
}
