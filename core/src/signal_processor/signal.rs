use chrono::{DateTime, Utc};

use crate::encounter::Encounter;

/// Signals emitted by the EncounterProcessor when the encounter lifecycle moves.
/// Callers dispatch these to `SignalHandler`s; the processor never calls out itself.
#[derive(Debug, Clone, PartialEq)]
pub enum GameSignal {
    /// Inactive -> active. `encounter_id` is freshly minted.
    EncounterStarted {
        encounter_id: String,
        timestamp: DateTime<Utc>,
    },
    /// One team is down; the fight resolves at `deadline` unless the condition clears.
    WipeArmed { team: u8, deadline: DateTime<Utc> },
    WipeDisarmed { timestamp: DateTime<Utc> },
    /// Active -> inactive. `persist` is false when the duration is outside the accepted window.
    EncounterEnded { encounter: Encounter, persist: bool },
    OwnTeamIdentified { team: u8 },
}

impl GameSignal {
    pub fn name(&self) -> &'static str {
        match self {
            GameSignal::EncounterStarted { .. } => "EncounterStarted",
            GameSignal::WipeArmed { .. } => "WipeArmed",
            GameSignal::WipeDisarmed { .. } => "WipeDisarmed",
            GameSignal::EncounterEnded { .. } => "EncounterEnded",
            GameSignal::OwnTeamIdentified { .. } => "OwnTeamIdentified",
        }
    }
}
