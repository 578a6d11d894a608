use chrono::TimeDelta;
use hashbrown::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::combat_log::{LogEvent, normalize_name};
use crate::encounter::Encounter;
use crate::game_data::{LIMIT_BREAK_JOB, LIMIT_BREAK_NAME, LOCAL_PLAYER_ALIAS, is_player_id};
use crate::signal_processor::{GameSignal, SignalHandler};

use super::snapshot::{CombatantSnapshot, CombatantStats};

/// Timelines are split per player id; a player's Limit Break rows get their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct TimelineKey {
    player_id: i32,
    limit_break: bool,
}

#[derive(Debug, Clone)]
struct TimelineEntry {
    /// Raw snapshot as received.
    snapshot: CombatantSnapshot,
    /// Subtracted from the raw stats to get effective stats.
    offset: CombatantStats,
}

impl TimelineEntry {
    fn effective_damage(&self) -> i32 {
        self.snapshot.stats.damage.saturating_sub(self.offset.damage)
    }

    fn effective(&self) -> CombatantSnapshot {
        CombatantSnapshot {
            stats: self.snapshot.stats - self.offset,
            ..self.snapshot.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PlayerTimeline {
    entries: Vec<TimelineEntry>,
}

impl PlayerTimeline {
    fn last(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }
}

/// Reconciles absolute counter snapshots into a strictly incremental timeline.
///
/// The source restarts its counters whenever its own fight id changes; those
/// restarts are bridged with a running offset so our totals never drop.
#[derive(Debug, Clone)]
pub struct CombatantReconciler {
    coalesce_window: TimeDelta,
    players: HashMap<TimelineKey, PlayerTimeline>,
    /// Last raw snapshot per player from before the most recent reset.
    carried: HashMap<TimelineKey, CombatantSnapshot>,
    local_name: Option<String>,
    local_world: Option<String>,
    updated: HashSet<TimelineKey>,
}

impl CombatantReconciler {
    pub fn new(coalesce_window: TimeDelta) -> Self {
        Self {
            coalesce_window,
            players: HashMap::new(),
            carried: HashMap::new(),
            local_name: None,
            local_world: None,
            updated: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Add one raw snapshot. Returns false when it was dropped.
    pub fn update(&mut self, mut snapshot: CombatantSnapshot) -> bool {
        if !is_player_id(snapshot.player_id) {
            trace!(player_id = snapshot.player_id, "Ignoring non-player combatant");
            return false;
        }

        let mut key = TimelineKey {
            player_id: snapshot.player_id,
            limit_break: false,
        };
        if snapshot.job.trim().is_empty() {
            key.limit_break = true;
            if !self.has_history(key.player_id) {
                debug!(player_id = snapshot.player_id, "Dropping jobless snapshot with no history");
                return false;
            }
            snapshot.name = LIMIT_BREAK_NAME.to_string();
            snapshot.job = LIMIT_BREAK_JOB.to_string();
        }

        let timeline = self.players.entry(key).or_default();
        let offset = match timeline.last() {
            None => match self.carried.get(&key) {
                Some(carried) if carried.upstream_encounter_id == snapshot.upstream_encounter_id => {
                    carried.stats
                }
                _ => CombatantStats::default(),
            },
            Some(last) if snapshot.time < last.snapshot.time => {
                debug!(
                    player_id = snapshot.player_id,
                    time = %snapshot.time,
                    last = %last.snapshot.time,
                    "Dropping late combatant snapshot"
                );
                return false;
            }
            Some(last) if last.snapshot.upstream_encounter_id != snapshot.upstream_encounter_id => {
                debug!(
                    player_id = snapshot.player_id,
                    from = %last.snapshot.upstream_encounter_id,
                    to = %snapshot.upstream_encounter_id,
                    "Upstream counters restarted, bridging"
                );
                last.offset - last.snapshot.stats
            }
            Some(last) if snapshot.time - last.snapshot.time < self.coalesce_window => {
                let offset = last.offset;
                if let Some(entry) = timeline.entries.last_mut() {
                    entry.snapshot = snapshot;
                    entry.offset = offset;
                }
                self.updated.insert(key);
                return true;
            }
            Some(last) => last.offset,
        };

        timeline.entries.push(TimelineEntry { snapshot, offset });
        self.updated.insert(key);
        true
    }

    fn has_history(&self, player_id: i32) -> bool {
        [false, true].into_iter().any(|limit_break| {
            let key = TimelineKey {
                player_id,
                limit_break,
            };
            self.players.contains_key(&key) || self.carried.contains_key(&key)
        })
    }

    /// Pick up the local player's real name and world from the world-name announcement.
    pub fn read_event(&mut self, event: &LogEvent) {
        if !event.is_world_name() {
            return;
        }
        let name = event.attacker_name.trim();
        let world = event.message.trim();
        if !name.is_empty() {
            self.local_name = Some(name.to_string());
        }
        if !world.is_empty() {
            self.local_world = Some(world.to_string());
        }
    }

    fn enrich(&self, mut snapshot: CombatantSnapshot) -> CombatantSnapshot {
        let is_local = snapshot.name == LOCAL_PLAYER_ALIAS
            || self
                .local_name
                .as_deref()
                .is_some_and(|name| normalize_name(name) == normalize_name(&snapshot.name));
        if !is_local {
            return snapshot;
        }
        if let Some(name) = &self.local_name {
            snapshot.name = name.clone();
        }
        if snapshot.world.is_empty()
            && let Some(world) = &self.local_world
        {
            snapshot.world = world.clone();
        }
        snapshot
    }

    fn sorted_keys<'a>(&self, keys: impl Iterator<Item = &'a TimelineKey>) -> Vec<TimelineKey> {
        let mut keys: Vec<TimelineKey> = keys.copied().collect();
        keys.sort_unstable();
        keys
    }

    fn latest(&self, key: &TimelineKey) -> Option<CombatantSnapshot> {
        let entry = self.players.get(key)?.last()?;
        Some(self.enrich(entry.effective()))
    }

    /// Every snapshot with the running offset removed, per player in time order.
    pub fn timeline(&self) -> Vec<CombatantSnapshot> {
        self.sorted_keys(self.players.keys())
            .iter()
            .filter_map(|key| self.players.get(key))
            .flat_map(|timeline| timeline.entries.iter())
            .map(|entry| self.enrich(entry.effective()))
            .collect()
    }

    /// One row per player: the most recent effective totals.
    pub fn latest_per_player(&self) -> Vec<CombatantSnapshot> {
        self.sorted_keys(self.players.keys())
            .iter()
            .filter_map(|key| self.latest(key))
            .collect()
    }

    /// Drain the latest totals of players updated since the previous call.
    pub fn take_updated(&mut self) -> Vec<CombatantSnapshot> {
        let keys = self.sorted_keys(self.updated.iter());
        self.updated.clear();
        keys.iter().filter_map(|key| self.latest(key)).collect()
    }

    /// Sum of the latest effective damage across players.
    pub fn total_damage(&self) -> i32 {
        self.players
            .values()
            .filter_map(PlayerTimeline::last)
            .fold(0i32, |sum, entry| sum.saturating_add(entry.effective_damage()))
    }

    /// Start over for a new local encounter, carrying each player's last raw reading.
    pub fn reset(&mut self) {
        for (key, timeline) in self.players.drain() {
            if let Some(last) = timeline.entries.into_iter().last() {
                self.carried.insert(key, last.snapshot);
            }
        }
        self.updated.clear();
    }
}

impl SignalHandler for CombatantReconciler {
    fn handle_signal(&mut self, signal: &GameSignal, _encounter: &Encounter) {
        if let GameSignal::EncounterStarted { encounter_id, .. } = signal {
            debug!(encounter_id = %encounter_id, "Resetting combatant timelines");
            self.reset();
        }
    }
}
