use phf::phf_set;

// log line categories (two hex digits after the timestamp header)
pub mod category {
    pub const GAME_LOG: u8 = 0x00;
    pub const ZONE_CHANGE: u8 = 0x01;
    pub const REMOVE_COMBATANT: u8 = 0x04;
    pub const SINGLE_TARGET: u8 = 0x15;
    pub const AOE: u8 = 0x16;
    pub const DEFEAT: u8 = 0x19;

    pub fn is_ability(category: u8) -> bool {
        category == SINGLE_TARGET || category == AOE
    }
}

// game log sub-types we care about, not exhaustive
pub mod game_log {
    pub const ECHO: u16 = 0x0038;
    /// Everything below this is player chat.
    pub const SYSTEM: u16 = 0x0039;
    pub const NPC_DIALOGUE: u16 = parsecast_types::GAME_LOG_NPC_DIALOGUE;
    pub const COUNTDOWN: [u16; 3] = [0x00B9, 0x0139, 0x0239];
    // synthetic lines emitted by the telemetry plugin itself
    pub const PLUGIN_ZONE: u16 = 0xFFFE;
    pub const PLUGIN_WORLD_NAME: u16 = 0xFFFF;

    pub fn is_chat(sub_type: u16) -> bool {
        sub_type < SYSTEM && sub_type != ECHO
    }

    pub fn is_countdown(sub_type: u16) -> bool {
        COUNTDOWN.contains(&sub_type)
    }
}

/// Echo text that force-ends the current encounter.
pub const ECHO_END: &str = "end";

/// Countdown announcements, one per client language.
pub const COUNTDOWN_PREFIXES: [&str; 4] = [
    "Battle commencing in ",
    "Début du combat dans ",
    "Noch ",
    "戦闘開始まで",
];

pub fn is_countdown_message(text: &str) -> bool {
    COUNTDOWN_PREFIXES.iter().any(|p| text.starts_with(p))
}

// Upstream bug: when one of these shows up in the flags slot the real
// flags/damage pair sits two fields further along. Observed values only.
pub static FIELD_SHIFT_MARKERS: phf::Set<&'static str> = phf_set! {
    "3F",
    "113",
    "213",
    "313",
    "A10",
    "E",
};

pub fn is_field_shift_marker(flags: &str) -> bool {
    FIELD_SHIFT_MARKERS.contains(flags)
}

// combatant ids
pub const PLAYER_ID_MIN: i32 = 0x1000_0000;
pub const PLAYER_ID_MAX: i32 = 0x1FFF_FFFF;

pub fn is_player_id(id: i32) -> bool {
    (PLAYER_ID_MIN..=PLAYER_ID_MAX).contains(&id)
}

pub const LIMIT_BREAK_NAME: &str = "Limit Break";
pub const LIMIT_BREAK_JOB: &str = "LB";

/// Name the source tool uses for the local player.
pub const LOCAL_PLAYER_ALIAS: &str = "YOU";
