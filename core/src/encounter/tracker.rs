//! Team membership and liveness for everyone seen in the current encounter.
//!
//! Entries live in an arena and are addressed by index; a name map points into
//! it, so growth never invalidates an entry held by index.

use hashbrown::HashMap;

use crate::combat_log::{LogEvent, normalize_name};

pub const NO_TEAM: u8 = 0;
const TEAMS: [u8; 2] = [1, 2];

fn opposing(team: u8) -> u8 {
    match team {
        1 => 2,
        2 => 1,
        _ => NO_TEAM,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCombatant {
    /// Trimmed, upper-cased name.
    pub name: String,
    pub team: u8,
    pub alive: bool,
    /// Someone other than itself has targeted it. Decorative entries never are.
    pub targeted: bool,
}

impl TrackedCombatant {
    fn new(name: String) -> Self {
        Self {
            name,
            team: NO_TEAM,
            alive: true,
            targeted: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamTracker {
    entries: Vec<TrackedCombatant>,
    index: HashMap<String, usize>,
    own_team: u8,
}

impl TeamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.own_team = NO_TEAM;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TrackedCombatant> {
        self.index
            .get(&normalize_name(name))
            .map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedCombatant> {
        self.entries.iter()
    }

    /// The local player's team, `NO_TEAM` until identified.
    pub fn own_team(&self) -> u8 {
        self.own_team
    }

    fn slot(&mut self, name: &str) -> usize {
        let key = normalize_name(name);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.entries.len();
        self.entries.push(TrackedCombatant::new(key.clone()));
        self.index.insert(key, idx);
        idx
    }

    /// Update membership and liveness from a damage/heal line.
    pub fn record_action(&mut self, event: &LogEvent) {
        if event.attacker_name.trim().is_empty()
            || event.target_name.trim().is_empty()
            || event.is_self_targeted()
        {
            return;
        }

        let attacker = self.slot(&event.attacker_name);
        let target = self.slot(&event.target_name);

        // acting, or showing hp, means alive again
        if event.attacker_hp != Some(0) {
            self.entries[attacker].alive = true;
        }
        if event.target_hp.is_some_and(|hp| hp > 0) {
            self.entries[target].alive = true;
        }
        self.entries[target].targeted = true;

        let (a_team, t_team) = (self.entries[attacker].team, self.entries[target].team);
        if event.is_heal() {
            match (a_team, t_team) {
                (NO_TEAM, NO_TEAM) => {}
                (team, NO_TEAM) => self.entries[target].team = team,
                (NO_TEAM, team) => self.entries[attacker].team = team,
                _ => {}
            }
        } else {
            match (a_team, t_team) {
                (NO_TEAM, NO_TEAM) => {
                    self.entries[attacker].team = 1;
                    self.entries[target].team = 2;
                }
                (team, NO_TEAM) => self.entries[target].team = opposing(team),
                (NO_TEAM, team) => self.entries[attacker].team = opposing(team),
                _ => {}
            }
        }
    }

    /// Mark a defeated or removed combatant. Returns false if it was never seen.
    pub fn mark_dead(&mut self, name: &str) -> bool {
        match self.index.get(&normalize_name(name)) {
            Some(&idx) => {
                self.entries[idx].alive = false;
                true
            }
            None => false,
        }
    }

    /// Set the local player's team from their name, once. Returns the team when newly set.
    pub fn identify_own_team(&mut self, name: &str) -> Option<u8> {
        if self.own_team != NO_TEAM {
            return None;
        }
        let team = self.get(name).map(|entry| entry.team)?;
        if team == NO_TEAM {
            return None;
        }
        self.own_team = team;
        Some(team)
    }

    /// The single team with nobody left standing, if exactly one is down.
    ///
    /// Only teams with at least one targeted member are considered; a team is
    /// down when none of its targeted members are alive.
    pub fn downed_team(&self) -> Option<u8> {
        let mut downed = TEAMS.iter().copied().filter(|&team| {
            let mut members = self
                .entries
                .iter()
                .filter(|e| e.team == team && e.targeted)
                .peekable();
            members.peek().is_some() && !members.any(|e| e.alive)
        });

        let first = downed.next()?;
        match downed.next() {
            Some(_) => None,
            None => Some(first),
        }
    }
}
