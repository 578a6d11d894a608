use std::ops::{Add, Neg, Sub};

use chrono::{DateTime, Utc};

use crate::wire::CombatantRecord;

/// The seven counters a combatant row carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatantStats {
    pub damage: i32,
    pub damage_taken: i32,
    pub damage_healed: i32,
    pub deaths: i32,
    pub hits: i32,
    pub heals: i32,
    pub kills: i32,
}

impl CombatantStats {
    fn zip(self, other: Self, f: impl Fn(i32, i32) -> i32) -> Self {
        Self {
            damage: f(self.damage, other.damage),
            damage_taken: f(self.damage_taken, other.damage_taken),
            damage_healed: f(self.damage_healed, other.damage_healed),
            deaths: f(self.deaths, other.deaths),
            hits: f(self.hits, other.hits),
            heals: f(self.heals, other.heals),
            kills: f(self.kills, other.kills),
        }
    }
}

impl Add for CombatantStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, i32::saturating_add)
    }
}

impl Sub for CombatantStats {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, i32::saturating_sub)
    }
}

impl Neg for CombatantStats {
    type Output = Self;

    fn neg(self) -> Self {
        Self::default() - self
    }
}

/// One combatant reading. Inbound the stats are the source's raw cumulative
/// counters; outbound they are effective totals for our encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatantSnapshot {
    pub player_id: i32,
    pub name: String,
    pub world: String,
    pub job: String,
    pub stats: CombatantStats,
    /// The source's own fight counter the stats are cumulative within.
    pub upstream_encounter_id: String,
    pub time: DateTime<Utc>,
}

impl CombatantSnapshot {
    pub fn from_record(record: &CombatantRecord) -> Self {
        Self {
            player_id: record.player_id,
            name: record.name.clone(),
            world: record.world.clone(),
            job: record.job.clone(),
            stats: CombatantStats {
                damage: record.damage,
                damage_taken: record.damage_taken,
                damage_healed: record.damage_healed,
                deaths: record.deaths,
                hits: record.hits,
                heals: record.heals,
                kills: record.kills,
            },
            upstream_encounter_id: record.encounter_id.clone(),
            time: record.time,
        }
    }

    pub fn to_record(&self, encounter_id: &str) -> CombatantRecord {
        CombatantRecord {
            encounter_id: encounter_id.to_string(),
            player_id: self.player_id,
            name: self.name.clone(),
            world: self.world.clone(),
            job: self.job.clone(),
            damage: self.stats.damage,
            damage_taken: self.stats.damage_taken,
            damage_healed: self.stats.damage_healed,
            deaths: self.stats.deaths,
            hits: self.stats.hits,
            heals: self.stats.heals,
            kills: self.stats.kills,
            time: self.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_arithmetic_saturates() {
        let a = CombatantStats {
            damage: i32::MAX,
            kills: 3,
            ..Default::default()
        };
        let b = CombatantStats {
            damage: 10,
            kills: 1,
            ..Default::default()
        };
        assert_eq!((a + b).damage, i32::MAX);
        assert_eq!((a - b).kills, 2);
        assert_eq!((-b).damage, -10);
        assert_eq!(b - (-b), b + b);
    }
}
