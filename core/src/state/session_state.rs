use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parsecast_types::ServerConfig;
use tracing::{debug, trace};

use crate::combat_log::LogParser;
use crate::combatant::{CombatantReconciler, CombatantSnapshot};
use crate::encounter::millis;
use crate::signal_processor::{EncounterProcessor, GameSignal, SignalHandler};
use crate::wire::{CombatantRecord, EncounterRecord, FlagRecord, LogLineRecord, Packet};

/// An ended encounter worth archiving, detached from live state.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedEncounter {
    pub encounter: EncounterRecord,
    /// Full effective timeline, every row.
    pub combatants: Vec<CombatantRecord>,
    pub log_lines: Vec<LogLineRecord>,
}

/// Everything one publish cycle has to send or store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbox {
    pub encounter: Option<EncounterRecord>,
    pub combatants: Vec<CombatantRecord>,
    pub log_lines: Vec<LogLineRecord>,
    pub flags: Vec<FlagRecord>,
    pub finished: Vec<FinishedEncounter>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.encounter.is_none()
            && self.combatants.is_empty()
            && self.log_lines.is_empty()
            && self.flags.is_empty()
            && self.finished.is_empty()
    }

    /// Every record in publish order.
    pub fn packets(&self) -> Vec<Packet> {
        let mut packets = Vec::with_capacity(
            1 + self.combatants.len() + self.log_lines.len() + self.flags.len(),
        );
        packets.extend(self.encounter.clone().map(Packet::Encounter));
        packets.extend(self.combatants.iter().cloned().map(Packet::Combatant));
        packets.extend(self.log_lines.iter().cloned().map(Packet::LogLine));
        packets.extend(self.flags.iter().cloned().map(Packet::Flag));
        packets
    }
}

/// All mutable state of one telemetry session.
///
/// Owned by exactly one session task; nothing here is shared.
pub struct SessionState {
    processor: EncounterProcessor,
    reconciler: CombatantReconciler,
    /// Lines not yet published.
    staged_lines: Vec<LogLineRecord>,
    /// Lines of the current encounter, kept for the archive.
    encounter_lines: Vec<LogLineRecord>,
    /// Most recent world-name announcement; opens every archived encounter so
    /// a replay can tell which team is ours.
    world_name_line: Option<LogLineRecord>,
    flags: HashMap<String, bool>,
    changed_flags: Vec<String>,
    finished: Vec<FinishedEncounter>,
}

impl SessionState {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_parts(
            EncounterProcessor::from_config(config),
            CombatantReconciler::new(millis(config.timings.coalesce_window_ms)),
        )
    }

    pub fn with_parts(processor: EncounterProcessor, reconciler: CombatantReconciler) -> Self {
        Self {
            processor,
            reconciler,
            staged_lines: Vec::new(),
            encounter_lines: Vec::new(),
            world_name_line: None,
            flags: HashMap::new(),
            changed_flags: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn processor(&self) -> &EncounterProcessor {
        &self.processor
    }

    pub fn reconciler(&self) -> &CombatantReconciler {
        &self.reconciler
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    /// Route one decoded packet from the telemetry source.
    pub fn apply(&mut self, packet: Packet, now: DateTime<Utc>) {
        match packet {
            Packet::Session(_) => trace!("Repeated handshake on live session"),
            Packet::Encounter(record) => self.processor.sync(&record),
            Packet::Combatant(record) => {
                self.reconciler.update(CombatantSnapshot::from_record(&record));
            }
            Packet::LogLine(record) => self.apply_log_line(record, now),
            Packet::Flag(record) => {
                if self.flags.insert(record.name.clone(), record.value) != Some(record.value) {
                    self.changed_flags.push(record.name);
                }
            }
        }
    }

    fn apply_log_line(&mut self, record: LogLineRecord, now: DateTime<Utc>) {
        let event = match LogParser::parse_line(&record.raw, record.time) {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "Dropping unparseable log line");
                return;
            }
        };
        if event.is_blank() {
            return;
        }

        self.reconciler.read_event(&event);

        let was_active = self.processor.is_active();
        let signals = self.processor.process_event(&event, now);
        let starting = signals
            .iter()
            .any(|s| matches!(s, GameSignal::EncounterStarted { .. }));
        if starting {
            self.encounter_lines.clear();
            if let Some(prelude) = &self.world_name_line {
                self.encounter_lines.push(LogLineRecord {
                    encounter_id: self.processor.encounter().id.clone(),
                    ..prelude.clone()
                });
            }
        }
        if event.is_world_name() {
            self.world_name_line = Some(LogLineRecord {
                encounter_id: String::new(),
                time: event.time,
                raw: record.raw.clone(),
            });
        }

        // the line that ends an encounter still belongs to it
        if was_active || self.processor.is_active() {
            let line = LogLineRecord {
                encounter_id: self.processor.encounter().id.clone(),
                time: event.time,
                raw: record.raw,
            };
            self.encounter_lines.push(line.clone());
            self.staged_lines.push(line);
        }

        self.dispatch(&signals);
    }

    fn dispatch(&mut self, signals: &[GameSignal]) {
        self.reconciler
            .handle_signals(signals, self.processor.encounter());

        for signal in signals {
            if let GameSignal::EncounterEnded { encounter, persist } = signal {
                let lines = std::mem::take(&mut self.encounter_lines);
                if !persist {
                    continue;
                }
                let combatants = self
                    .reconciler
                    .timeline()
                    .iter()
                    .map(|row| row.to_record(&encounter.id))
                    .collect();
                self.finished.push(FinishedEncounter {
                    encounter: encounter.to_record(self.reconciler.total_damage()),
                    combatants,
                    log_lines: lines,
                });
            }
        }
    }

    /// Run the periodic liveness check and collect everything to publish.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Outbox {
        let signals = self.processor.tick(now);
        self.dispatch(&signals);

        let encounter = self.processor.encounter();
        let encounter_record = (!encounter.id.is_empty())
            .then(|| encounter.to_record(self.reconciler.total_damage()));
        let encounter_id = encounter.id.clone();

        let combatants = self
            .reconciler
            .take_updated()
            .iter()
            .map(|row| row.to_record(&encounter_id))
            .collect();

        let flags = std::mem::take(&mut self.changed_flags)
            .into_iter()
            .filter_map(|name| {
                let value = *self.flags.get(&name)?;
                Some(FlagRecord { name, value })
            })
            .collect();

        Outbox {
            encounter: encounter_record,
            combatants,
            log_lines: std::mem::take(&mut self.staged_lines),
            flags,
            finished: std::mem::take(&mut self.finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::EncounterOutcome;
    use crate::wire::SessionRecord;
    use chrono::{TimeDelta, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn line(secs: i64, body: &str) -> Packet {
        Packet::LogLine(LogLineRecord {
            encounter_id: "upstream".into(),
            time: at(secs),
            raw: format!("[21:00:00.000] {body}"),
        })
    }

    fn combatant(damage: i32, secs: i64) -> Packet {
        Packet::Combatant(CombatantRecord {
            encounter_id: "3".into(),
            player_id: 0x1000_0001,
            name: "YOU".into(),
            world: String::new(),
            job: "BLM".into(),
            damage,
            damage_taken: 0,
            damage_healed: 0,
            deaths: 0,
            hits: 1,
            heals: 0,
            kills: 0,
            time: at(secs),
        })
    }

    const HIT: &str = "15:10000001:Alpha:2E:Fire:40000001:Ifrit:3:03E80000";

    fn state() -> SessionState {
        SessionState::new(&ServerConfig::default())
    }

    #[test]
    fn test_tick_before_any_encounter_is_empty() {
        let mut s = state();
        s.apply(
            Packet::Session(SessionRecord {
                version: 1,
                upload_key: "k".into(),
            }),
            at(0),
        );
        assert!(s.tick(at(1)).is_empty());
    }

    #[test]
    fn test_lines_outside_encounter_are_not_staged() {
        let mut s = state();
        s.apply(line(0, "01:Changed Zone to The Navel."), at(0));
        s.apply(line(1, "00:000E:Alpha:hello"), at(1));
        s.apply(line(2, "garbage"), at(2));
        assert!(s.tick(at(3)).log_lines.is_empty());
    }

    #[test]
    fn test_active_encounter_publishes_lines_and_combatants() {
        let mut s = state();
        s.apply(line(-1, "00:FFFF:Alpha:Balmung"), at(-1));
        s.apply(line(0, HIT), at(0));
        s.apply(combatant(1000, 0), at(0));

        let out = s.tick(at(1));
        let enc = out.encounter.as_ref().expect("encounter record");
        assert!(enc.active);
        assert_eq!(enc.damage, 1000);
        assert_eq!(out.log_lines.len(), 1);
        assert_eq!(out.log_lines[0].encounter_id, enc.id);
        assert_eq!(out.combatants.len(), 1);
        assert_eq!(out.combatants[0].encounter_id, enc.id);
        assert_eq!(out.combatants[0].name, "Alpha");
        assert_eq!(out.combatants[0].world, "Balmung");

        let again = s.tick(at(2));
        assert!(again.log_lines.is_empty());
        assert!(again.combatants.is_empty());
        assert!(again.encounter.is_some());
        assert_eq!(out.packets().len(), 3);
    }

    #[test]
    fn test_finished_encounter_carries_archive() {
        let mut s = state();
        s.apply(line(-1, "00:FFFF:Alpha:Balmung"), at(-1));
        s.apply(line(0, HIT), at(0));
        s.apply(combatant(1000, 0), at(0));
        s.apply(line(20, HIT), at(20));
        s.apply(combatant(3000, 20), at(20));
        s.apply(line(21, "19:Ifrit was defeated by Alpha."), at(21));
        s.tick(at(22));

        let out = s.tick(at(31));
        assert_eq!(out.finished.len(), 1);
        let finished = &out.finished[0];
        assert_eq!(finished.encounter.outcome, EncounterOutcome::Clear);
        assert!(!finished.encounter.active);
        assert_eq!(finished.encounter.damage, 3000);
        assert_eq!(finished.log_lines.len(), 4);
        assert_eq!(finished.log_lines[0].raw, "[21:00:00.000] 00:FFFF:Alpha:Balmung");
        assert_eq!(finished.log_lines[0].time, at(-1));
        assert!(finished.log_lines.iter().all(|l| l.encounter_id == finished.encounter.id));

        let replayed = EncounterProcessor::default().replay(&finished.log_lines);
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].outcome, EncounterOutcome::Clear);
        assert_eq!(finished.combatants.len(), 2);
        assert!(finished.combatants.iter().all(|c| c.encounter_id == finished.encounter.id));
        assert!(s.tick(at(32)).finished.is_empty());
    }

    #[test]
    fn test_short_encounter_is_not_archived() {
        let mut s = state();
        s.apply(line(0, HIT), at(0));
        s.apply(line(1, "00:0038::end"), at(1));
        let out = s.tick(at(2));
        assert!(out.finished.is_empty());
        // the ending line was still published with the encounter
        assert_eq!(out.log_lines.len(), 2);
    }

    #[test]
    fn test_flags_republish_on_change() {
        let mut s = state();
        let flag = |value| {
            Packet::Flag(FlagRecord {
                name: "logging".into(),
                value,
            })
        };
        s.apply(flag(true), at(0));
        s.apply(flag(true), at(0));
        let out = s.tick(at(1));
        assert_eq!(
            out.flags,
            vec![FlagRecord {
                name: "logging".into(),
                value: true
            }]
        );
        assert_eq!(s.flag("logging"), Some(true));

        s.apply(flag(true), at(2));
        assert!(s.tick(at(3)).flags.is_empty());
        s.apply(flag(false), at(4));
        assert_eq!(s.tick(at(5)).flags.len(), 1);
    }
}
