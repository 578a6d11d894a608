use chrono::{DateTime, TimeDelta, Utc};
use parsecast_types::{EncounterTimings, ServerConfig};
use tracing::{debug, info};

use crate::combat_log::{LogEvent, LogParser, normalize_name};
use crate::encounter::{Encounter, EncounterOutcome, TeamTracker, millis};
use crate::game_data::{ECHO_END, category, game_log, is_countdown_message};
use crate::signal_processor::signal::GameSignal;
use crate::wire::{EncounterRecord, LogLineRecord};

use super::combat_state;

/// Drives one session's encounter through inactive -> active -> inactive.
///
/// Log timestamps drive the encounter's start/end times; wall-clock decisions
/// (wipe deadline, inactivity) use the `now` passed by the caller.
pub struct EncounterProcessor {
    pub(super) encounter: Encounter,
    pub(super) tracker: TeamTracker,
    pub(super) wipe_grace: TimeDelta,
    pub(super) inactivity_timeout: TimeDelta,
    pub(super) min_duration: TimeDelta,
    pub(super) max_duration: TimeDelta,
    boss_dialogue_types: Vec<u16>,
    pub(super) wipe_deadline: Option<DateTime<Utc>>,
    /// Wall-clock time of the last qualifying event.
    pub(super) last_activity: Option<DateTime<Utc>>,
    /// Local player's name from the world-name announcement. Survives encounters.
    own_name: Option<String>,
}

impl Default for EncounterProcessor {
    fn default() -> Self {
        Self::new(EncounterTimings::default(), vec![game_log::NPC_DIALOGUE])
    }
}

impl EncounterProcessor {
    pub fn new(timings: EncounterTimings, boss_dialogue_types: Vec<u16>) -> Self {
        Self {
            encounter: Encounter::new(),
            tracker: TeamTracker::new(),
            wipe_grace: millis(timings.wipe_grace_ms),
            inactivity_timeout: millis(timings.inactivity_timeout_ms),
            min_duration: millis(timings.min_duration_ms),
            max_duration: millis(timings.max_duration_ms),
            boss_dialogue_types,
            wipe_deadline: None,
            last_activity: None,
            own_name: None,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.timings, config.boss_dialogue_types.clone())
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    pub fn tracker(&self) -> &TeamTracker {
        &self.tracker
    }

    pub fn is_active(&self) -> bool {
        self.encounter.active
    }

    pub fn wipe_deadline(&self) -> Option<DateTime<Utc>> {
        self.wipe_deadline
    }

    pub fn own_name(&self) -> Option<&str> {
        self.own_name.as_deref()
    }

    /// Process one parsed log event.
    /// Returns signals for the caller to dispatch.
    pub fn process_event(&mut self, event: &LogEvent, now: DateTime<Utc>) -> Vec<GameSignal> {
        if event.is_blank() {
            return Vec::new();
        }

        if event.time < self.encounter.end_time {
            debug!(
                event_time = %event.time,
                end_time = %self.encounter.end_time,
                "Ignoring stale log event"
            );
            return Vec::new();
        }

        match event.category {
            c if category::is_ability(c) => self.handle_action(event, now),
            category::DEFEAT | category::REMOVE_COMBATANT => self.handle_defeat(event, now),
            category::ZONE_CHANGE => self.handle_zone_change(&event.message, now),
            category::GAME_LOG => self.handle_game_log(event, now),
            _ => Vec::new(),
        }
    }

    /// Periodic check: resolve any lapsed wipe deadline, then end on inactivity.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<GameSignal> {
        let mut signals = combat_state::check_liveness(self, now);

        if self.encounter.active
            && let Some(last) = self.last_activity
            && now - last >= self.inactivity_timeout
        {
            info!(encounter_id = %self.encounter.id, "Encounter inactive, ending");
            signals.extend(combat_state::end_encounter(self, EncounterOutcome::UnknownEnd));
        }

        signals
    }

    /// Resolve whatever is pending as if nothing arrives after `at`: first an
    /// armed wipe deadline, then the inactivity timeout.
    pub fn settle(&mut self, at: DateTime<Utc>) -> Vec<GameSignal> {
        let after = |span: TimeDelta| at.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut signals = self.tick(after(self.wipe_grace));
        if self.encounter.active {
            signals.extend(self.tick(after(self.inactivity_timeout)));
        }
        signals
    }

    /// Run archived lines back through the state machine, log time standing in
    /// for the wall clock. Returns every encounter that ended.
    pub fn replay<'a>(
        &mut self,
        lines: impl IntoIterator<Item = &'a LogLineRecord>,
    ) -> Vec<Encounter> {
        let mut signals = Vec::new();
        let mut last = None;
        for line in lines {
            match LogParser::parse_line(&line.raw, line.time) {
                Ok(event) => signals.extend(self.process_event(&event, line.time)),
                Err(err) => debug!(error = %err, "Skipping unparseable archived line"),
            }
            last = Some(line.time);
        }
        if let Some(last) = last {
            signals.extend(self.settle(last));
        }

        signals
            .into_iter()
            .filter_map(|signal| match signal {
                GameSignal::EncounterEnded { encounter, .. } => Some(encounter),
                _ => None,
            })
            .collect()
    }

    /// Apply an Encounter record sent by the telemetry source.
    ///
    /// The source's id is its own internal fight counter; it is kept as the
    /// upstream id and never replaces ours.
    pub fn sync(&mut self, record: &EncounterRecord) {
        if let Ok(upstream_id) = record.id.trim().parse::<i32>() {
            self.encounter.upstream_id = upstream_id;
        }
        if !self.encounter.active && !record.zone.is_empty() {
            self.encounter.zone = record.zone.clone();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_action(&mut self, event: &LogEvent, now: DateTime<Utc>) -> Vec<GameSignal> {
        if !event.is_combat_action() {
            return Vec::new();
        }

        let mut signals = Vec::new();

        if !self.encounter.active {
            if event.is_self_targeted() {
                return signals;
            }
            self.tracker.clear();
            self.wipe_deadline = None;
            self.encounter.begin(event.time);
            info!(
                encounter_id = %self.encounter.id,
                zone = %self.encounter.zone,
                "Encounter started"
            );
            signals.push(GameSignal::EncounterStarted {
                encounter_id: self.encounter.id.clone(),
                timestamp: event.time,
            });
        }

        self.encounter.advance(event.time);
        self.last_activity = Some(now);
        self.tracker.record_action(event);
        signals.extend(self.try_identify_own_team());
        signals.extend(combat_state::check_liveness(self, now));
        signals
    }

    fn handle_defeat(&mut self, event: &LogEvent, now: DateTime<Utc>) -> Vec<GameSignal> {
        if !self.encounter.active {
            return Vec::new();
        }
        if !self.tracker.mark_dead(&event.target_name) {
            debug!(name = %event.target_name, "Defeat for untracked combatant");
        }
        combat_state::check_liveness(self, now)
    }

    fn handle_zone_change(&mut self, zone: &str, now: DateTime<Utc>) -> Vec<GameSignal> {
        let zone = zone.trim();
        if zone.is_empty() {
            return Vec::new();
        }

        let mut signals = Vec::new();
        if self.encounter.active && zone != self.encounter.zone {
            debug!(from = %self.encounter.zone, to = %zone, "Zone changed mid-encounter");
            signals.extend(combat_state::force_end(self, now, "zone change"));
        }
        self.encounter.zone = zone.to_string();
        signals
    }

    fn handle_game_log(&mut self, event: &LogEvent, now: DateTime<Utc>) -> Vec<GameSignal> {
        let sub_type = event.game_log_type;
        let message = event.message.trim();

        match sub_type {
            game_log::PLUGIN_ZONE => self.handle_zone_change(message, now),
            game_log::PLUGIN_WORLD_NAME => {
                let name = event.attacker_name.trim();
                if name.is_empty() {
                    return Vec::new();
                }
                info!(name = %name, world = %message, "Local player identified");
                self.own_name = Some(normalize_name(name));
                self.try_identify_own_team().into_iter().collect()
            }
            game_log::ECHO if message.eq_ignore_ascii_case(ECHO_END) => {
                combat_state::force_end(self, now, "echo end")
            }
            t if game_log::is_countdown(t) && is_countdown_message(message) => {
                combat_state::force_end(self, now, "countdown")
            }
            t if self.boss_dialogue_types.contains(&t) && self.wipe_deadline.is_some() => {
                combat_state::disarm(self, now, "boss dialogue")
            }
            _ => Vec::new(),
        }
    }

    fn try_identify_own_team(&mut self) -> Option<GameSignal> {
        let name = self.own_name.as_deref()?;
        let team = self.tracker.identify_own_team(name)?;
        info!(team, "Own team identified");
        Some(GameSignal::OwnTeamIdentified { team })
    }
}
