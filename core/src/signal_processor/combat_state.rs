//! Liveness state machine for the active encounter.
//!
//! - A team with every targeted member dead arms a wipe deadline.
//! - The deadline lapsing with the condition still true ends the encounter.
//! - Forced ends (zone change, echo, countdown) resolve an armed deadline immediately.
//!
//! Every transition out of `active` goes through `end_encounter`.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::encounter::{EncounterOutcome, NO_TEAM};

use super::GameSignal;
use super::processor::EncounterProcessor;

/// Outcome when `downed` is the team with nobody left standing.
pub(super) fn outcome_for(downed: u8, own_team: u8) -> EncounterOutcome {
    if own_team == NO_TEAM {
        EncounterOutcome::UnknownEnd
    } else if downed == own_team {
        EncounterOutcome::Wipe
    } else {
        EncounterOutcome::Clear
    }
}

/// Arm, disarm or resolve the wipe deadline against the tracker's current state.
pub(super) fn check_liveness(p: &mut EncounterProcessor, now: DateTime<Utc>) -> Vec<GameSignal> {
    if !p.encounter.active {
        return Vec::new();
    }

    match (p.tracker.downed_team(), p.wipe_deadline) {
        (Some(team), None) => {
            let deadline = now
                .checked_add_signed(p.wipe_grace)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            p.wipe_deadline = Some(deadline);
            p.encounter.awaiting_wipe = true;
            debug!(encounter_id = %p.encounter.id, team, %deadline, "Wipe deadline armed");
            vec![GameSignal::WipeArmed { team, deadline }]
        }
        (Some(team), Some(deadline)) if now >= deadline => {
            let outcome = outcome_for(team, p.tracker.own_team());
            end_encounter(p, outcome)
        }
        (None, Some(_)) => disarm(p, now, "team alive again"),
        _ => Vec::new(),
    }
}

pub(super) fn disarm(p: &mut EncounterProcessor, now: DateTime<Utc>, reason: &str) -> Vec<GameSignal> {
    if p.wipe_deadline.take().is_none() {
        return Vec::new();
    }
    p.encounter.awaiting_wipe = false;
    info!(encounter_id = %p.encounter.id, reason, "Wipe deadline disarmed");
    vec![GameSignal::WipeDisarmed { timestamp: now }]
}

/// End the active encounter now. An armed deadline resolves immediately.
pub(super) fn force_end(p: &mut EncounterProcessor, _now: DateTime<Utc>, reason: &str) -> Vec<GameSignal> {
    if !p.encounter.active {
        return Vec::new();
    }

    let outcome = match (p.wipe_deadline, p.tracker.downed_team()) {
        (Some(_), Some(team)) => outcome_for(team, p.tracker.own_team()),
        _ => EncounterOutcome::UnknownEnd,
    };
    debug!(encounter_id = %p.encounter.id, reason, outcome = outcome.label(), "Forcing encounter end");
    end_encounter(p, outcome)
}

pub(super) fn end_encounter(p: &mut EncounterProcessor, outcome: EncounterOutcome) -> Vec<GameSignal> {
    let enc = &mut p.encounter;
    enc.active = false;
    enc.outcome = outcome;
    enc.awaiting_wipe = false;
    p.wipe_deadline = None;

    let duration = enc.duration();
    let persist = duration >= p.min_duration && duration <= p.max_duration;
    info!(
        encounter_id = %enc.id,
        outcome = outcome.label(),
        duration_ms = duration.num_milliseconds(),
        persist,
        "Encounter ended"
    );
    if !persist {
        debug!(encounter_id = %enc.id, "Encounter outside accepted duration, not persisting");
    }

    vec![GameSignal::EncounterEnded {
        encounter: enc.clone(),
        persist,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for() {
        assert_eq!(outcome_for(1, NO_TEAM), EncounterOutcome::UnknownEnd);
        assert_eq!(outcome_for(1, 1), EncounterOutcome::Wipe);
        assert_eq!(outcome_for(2, 1), EncounterOutcome::Clear);
    }
}
