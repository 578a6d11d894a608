pub mod tracker;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::wire::EncounterRecord;

pub use tracker::{TeamTracker, TrackedCombatant, NO_TEAM};

/// Convert a configured millisecond span, saturating instead of panicking.
pub fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

/// How an encounter ended. `LegacyWipe` comes from older sources and means the same as `Wipe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncounterOutcome {
    #[default]
    UnknownEnd,
    Clear,
    Wipe,
    LegacyWipe,
}

impl EncounterOutcome {
    pub fn as_byte(self) -> u8 {
        match self {
            EncounterOutcome::UnknownEnd => 0,
            EncounterOutcome::Clear => 1,
            EncounterOutcome::Wipe => 2,
            EncounterOutcome::LegacyWipe => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(EncounterOutcome::UnknownEnd),
            1 => Some(EncounterOutcome::Clear),
            2 => Some(EncounterOutcome::Wipe),
            3 => Some(EncounterOutcome::LegacyWipe),
            _ => None,
        }
    }

    pub fn is_wipe(self) -> bool {
        matches!(self, EncounterOutcome::Wipe | EncounterOutcome::LegacyWipe)
    }

    pub fn label(self) -> &'static str {
        match self {
            EncounterOutcome::UnknownEnd => "unknown",
            EncounterOutcome::Clear => "clear",
            EncounterOutcome::Wipe | EncounterOutcome::LegacyWipe => "wipe",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    /// Fresh on every inactive -> active transition. Empty before the first one.
    pub id: String,
    pub zone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub outcome: EncounterOutcome,
    pub active: bool,
    /// Fight id reported by the telemetry source; may change mid-encounter.
    pub upstream_id: i32,
    /// A wipe/clear is pending confirmation.
    pub awaiting_wipe: bool,
}

impl Default for Encounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Encounter {
    pub fn new() -> Self {
        Self {
            id: String::new(),
            zone: String::new(),
            start_time: DateTime::<Utc>::UNIX_EPOCH,
            end_time: DateTime::<Utc>::UNIX_EPOCH,
            outcome: EncounterOutcome::UnknownEnd,
            active: false,
            upstream_id: 0,
            awaiting_wipe: false,
        }
    }

    /// Begin a new fight at `time`, keeping zone and upstream id.
    pub fn begin(&mut self, time: DateTime<Utc>) {
        self.id = Uuid::new_v4().to_string();
        self.start_time = time;
        self.end_time = time;
        self.outcome = EncounterOutcome::UnknownEnd;
        self.active = true;
        self.awaiting_wipe = false;
    }

    /// Move the end time forward; never backwards.
    pub fn advance(&mut self, time: DateTime<Utc>) {
        if time > self.end_time {
            self.end_time = time;
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn to_record(&self, damage: i32) -> EncounterRecord {
        EncounterRecord {
            id: self.id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            zone: self.zone.clone(),
            damage,
            active: self.active,
            outcome: self.outcome,
        }
    }
}
