use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::game_data::{category, game_log};

bitflags! {
    /// Outcome of an ability line, decoded from its flags field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LogFlags: u16 {
        const DODGE = 1;
        const DAMAGE = 1 << 1;
        const CRIT = 1 << 2;
        const DIRECT_HIT = 1 << 3;
        const INSTANT_DEATH = 1 << 4;
        const HEAL = 1 << 5;
        const BLOCK = 1 << 6;
        const PARRY = 1 << 7;
    }
}

/// One typed event decoded from a raw log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub category: u8,
    /// Raw line text. Blank for discarded chat lines.
    pub raw: String,
    pub time: DateTime<Utc>,
    pub attacker_id: u32,
    pub attacker_name: String,
    pub target_id: u32,
    pub target_name: String,
    pub ability_id: u32,
    pub ability_name: String,
    pub flags: LogFlags,
    pub damage: i64,
    pub target_hp: Option<u32>,
    pub target_max_hp: Option<u32>,
    pub attacker_hp: Option<u32>,
    pub attacker_max_hp: Option<u32>,
    /// Game log sub-type, only meaningful for `category::GAME_LOG`.
    pub game_log_type: u16,
    /// Game log text, or the zone name for zone changes.
    pub message: String,
}

impl LogEvent {
    pub fn new(category: u8, raw: &str, time: DateTime<Utc>) -> Self {
        Self {
            category,
            raw: raw.to_string(),
            time,
            attacker_id: 0,
            attacker_name: String::new(),
            target_id: 0,
            target_name: String::new(),
            ability_id: 0,
            ability_name: String::new(),
            flags: LogFlags::empty(),
            damage: 0,
            target_hp: None,
            target_max_hp: None,
            attacker_hp: None,
            attacker_max_hp: None,
            game_log_type: 0,
            message: String::new(),
        }
    }

    /// Damage or heal line with a decoded outcome.
    pub fn is_combat_action(&self) -> bool {
        category::is_ability(self.category) && !self.flags.is_empty()
    }

    pub fn is_heal(&self) -> bool {
        self.flags.contains(LogFlags::HEAL)
    }

    pub fn is_self_targeted(&self) -> bool {
        self.attacker_id == self.target_id
            || normalize_name(&self.attacker_name) == normalize_name(&self.target_name)
    }

    pub fn is_game_log(&self, sub_type: u16) -> bool {
        self.category == category::GAME_LOG && self.game_log_type == sub_type
    }

    pub fn is_world_name(&self) -> bool {
        self.is_game_log(game_log::PLUGIN_WORLD_NAME)
    }

    /// True for lines that carry nothing worth keeping (discarded chat).
    pub fn is_blank(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Names are compared trimmed and upper-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}
