use super::*;
use crate::game_data::{category, game_log, is_field_shift_marker};
use chrono::{DateTime, Utc};
use memchr::memchr_iter;
use regex::Regex;
use std::sync::LazyLock;


/// `[HH:MM:SS.mmm] ` prefix in front of every line.
const HEADER_LEN: usize = 15;
/// Header plus the two category digits.
pub const MIN_LINE_LEN: usize = HEADER_LEN + 2;
/// Ability lines need everything up to and including the damage field.
const MIN_ABILITY_FIELDS: usize = 9;

const COLON_PLACEHOLDER: &str = "\u{E000}";

mod field {
    pub const ATTACKER_ID: usize = 1;
    pub const ATTACKER_NAME: usize = 2;
    pub const ABILITY_ID: usize = 3;
    pub const ABILITY_NAME: usize = 4;
    pub const TARGET_ID: usize = 5;
    pub const TARGET_NAME: usize = 6;
    pub const FLAGS: usize = 7;
    pub const DAMAGE: usize = 8;
    pub const SHIFT: usize = 2;
    pub const TARGET_HP: usize = 23;
    pub const TARGET_MAX_HP: usize = 24;
    pub const ATTACKER_HP: usize = 33;
    pub const ATTACKER_MAX_HP: usize = 34;
}

static DEFEAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^19:(?P<target>.*?) was defeated by (?P<attacker>.*?)\.?$")
        .expect("defeat pattern is valid")
});

static ZONE_CHANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^01:Changed Zone to (?P<zone>.*?)\.?$").expect("zone pattern is valid")
});

static REMOVE_COMBATANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^04:Removing combatant (?P<name>[^.]*)\.(?:\s+Max HP: (?P<max_hp>\d+))?")
        .expect("remove combatant pattern is valid")
});

macro_rules! parse_u32 {
    ($s:expr) => {
        $s.trim().parse::<u32>().ok()
    };
}

pub struct LogParser;

impl LogParser {
    /// Parse one raw line received at `time`.
    pub fn parse_line(raw: &str, time: DateTime<Utc>) -> Result<LogEvent, ParseError> {
        if raw.len() < MIN_LINE_LEN {
            return Err(ParseError::TooShort {
                len: raw.len(),
                min: MIN_LINE_LEN,
            });
        }

        let code = raw.get(HEADER_LEN..MIN_LINE_LEN).unwrap_or_default();
        let category = u8::from_str_radix(code, 16).map_err(|_| ParseError::MalformedHex {
            field: "category",
            value: code.to_string(),
        })?;

        let mut event = LogEvent::new(category, raw, time);
        match category {
            category::SINGLE_TARGET | category::AOE => Self::parse_ability(&mut event, raw)?,
            category::DEFEAT => Self::parse_defeat(&mut event, raw)?,
            category::ZONE_CHANGE => Self::parse_zone_change(&mut event, raw)?,
            category::REMOVE_COMBATANT => Self::parse_remove_combatant(&mut event, raw)?,
            category::GAME_LOG => Self::parse_game_log(&mut event, raw)?,
            _ => {}
        }
        Ok(event)
    }

    fn parse_ability(event: &mut LogEvent, raw: &str) -> Result<(), ParseError> {
        // ability names may contain ": " which must survive the split
        let protected = raw[HEADER_LEN..].replace(": ", COLON_PLACEHOLDER);
        let fields = split_fields(&protected);
        if fields.len() < MIN_ABILITY_FIELDS {
            return Err(ParseError::TooFewFields {
                expected: MIN_ABILITY_FIELDS,
                found: fields.len(),
            });
        }

        let (flags, damage) = if is_field_shift_marker(fields[field::FLAGS]) {
            let shifted = field::DAMAGE + field::SHIFT;
            if fields.len() <= shifted {
                return Err(ParseError::TooFewFields {
                    expected: shifted + 1,
                    found: fields.len(),
                });
            }
            (fields[field::FLAGS + field::SHIFT], fields[shifted])
        } else {
            (fields[field::FLAGS], fields[field::DAMAGE])
        };

        event.attacker_id = parse_hex_field(fields[field::ATTACKER_ID], "attacker id", false)?;
        event.attacker_name = restore(fields[field::ATTACKER_NAME]);
        event.ability_id = parse_hex_field(fields[field::ABILITY_ID], "ability id", true)?;
        event.ability_name = restore(fields[field::ABILITY_NAME]);
        event.target_id = parse_hex_field(fields[field::TARGET_ID], "target id", true)?;
        event.target_name = restore(fields[field::TARGET_NAME]);

        if !flags.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::MalformedHex {
                field: "flags",
                value: flags.to_string(),
            });
        }
        event.flags = Self::decode_flags(flags);
        event.damage = Self::decode_damage(damage)?;

        event.target_hp = fields.get(field::TARGET_HP).and_then(|s| parse_u32!(s));
        event.target_max_hp = fields.get(field::TARGET_MAX_HP).and_then(|s| parse_u32!(s));
        event.attacker_hp = fields.get(field::ATTACKER_HP).and_then(|s| parse_u32!(s));
        event.attacker_max_hp = fields.get(field::ATTACKER_MAX_HP).and_then(|s| parse_u32!(s));
        Ok(())
    }

    /// Decode the outcome flags from the trailing hex digits.
    fn decode_flags(flags: &str) -> LogFlags {
        let bytes = flags.as_bytes();
        // n = 1 is the last digit
        let digit = |n: usize| {
            bytes
                .len()
                .checked_sub(n)
                .map(|i| bytes[i].to_ascii_uppercase())
        };

        match digit(1) {
            Some(b'1') => LogFlags::DODGE,
            Some(b'3') if digit(2) == Some(b'3') => LogFlags::INSTANT_DEATH,
            Some(b'3') => {
                LogFlags::DAMAGE
                    | match digit(4) {
                        Some(b'2') => LogFlags::CRIT,
                        Some(b'4') => LogFlags::DIRECT_HIT,
                        Some(b'6') => LogFlags::CRIT | LogFlags::DIRECT_HIT,
                        _ => LogFlags::empty(),
                    }
            }
            Some(b'4') if digit(6) == Some(b'2') => LogFlags::HEAL | LogFlags::CRIT,
            Some(b'4') => LogFlags::HEAL,
            Some(b'5') => LogFlags::BLOCK | LogFlags::DAMAGE,
            Some(b'6') => LogFlags::PARRY | LogFlags::DAMAGE,
            _ => LogFlags::empty(),
        }
    }

    /// Amount is the left four digits of the (zero padded) 8-digit field. A `4` in
    /// the third digit from the right means the top byte wrapped into the last two.
    fn decode_damage(value: &str) -> Result<i64, ParseError> {
        let malformed = || ParseError::MalformedHex {
            field: "damage",
            value: value.to_string(),
        };
        if value.is_empty() {
            return Ok(0);
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        let padded = format!("{value:0>8}");
        let len = padded.len();
        let amount = i64::from_str_radix(&padded[..len - 4], 16).map_err(|_| malformed())?;
        if padded.as_bytes()[len - 3] == b'4' {
            let wrapped = i64::from_str_radix(&padded[len - 2..], 16).map_err(|_| malformed())?;
            return Ok(amount - wrapped + (wrapped << 16));
        }
        Ok(amount)
    }

    fn parse_defeat(event: &mut LogEvent, raw: &str) -> Result<(), ParseError> {
        let caps = DEFEAT_RE
            .captures(&raw[HEADER_LEN..])
            .ok_or(ParseError::NoMatch { kind: "defeat" })?;
        event.target_name = caps["target"].trim().to_string();
        event.attacker_name = caps["attacker"].trim().to_string();
        Ok(())
    }

    fn parse_zone_change(event: &mut LogEvent, raw: &str) -> Result<(), ParseError> {
        let caps = ZONE_CHANGE_RE
            .captures(&raw[HEADER_LEN..])
            .ok_or(ParseError::NoMatch { kind: "zone change" })?;
        event.message = caps["zone"].trim().to_string();
        Ok(())
    }

    fn parse_remove_combatant(event: &mut LogEvent, raw: &str) -> Result<(), ParseError> {
        let caps = REMOVE_COMBATANT_RE
            .captures(&raw[HEADER_LEN..])
            .ok_or(ParseError::NoMatch {
                kind: "remove combatant",
            })?;
        event.target_name = caps["name"].trim().to_string();
        event.target_max_hp = caps.name("max_hp").and_then(|m| parse_u32!(m.as_str()));
        Ok(())
    }

    fn parse_game_log(event: &mut LogEvent, raw: &str) -> Result<(), ParseError> {
        // 00:TYPE:speaker:message, message may itself contain colons
        let mut parts = raw[HEADER_LEN..].splitn(4, ':');
        let _category = parts.next();
        let sub_type = parts.next().ok_or(ParseError::TooFewFields {
            expected: 2,
            found: 1,
        })?;
        event.game_log_type =
            u16::from_str_radix(sub_type, 16).map_err(|_| ParseError::MalformedHex {
                field: "game log type",
                value: sub_type.to_string(),
            })?;

        if game_log::is_chat(event.game_log_type) {
            event.raw.clear();
            return Ok(());
        }

        event.attacker_name = parts.next().unwrap_or_default().trim().to_string();
        event.message = parts.next().unwrap_or_default().trim().to_string();
        Ok(())
    }
}

fn split_fields(s: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(48);
    let mut start = 0;
    for pos in memchr_iter(b':', s.as_bytes()) {
        fields.push(&s[start..pos]);
        start = pos + 1;
    }
    fields.push(&s[start..]);
    fields
}

fn restore(field: &str) -> String {
    field.replace(COLON_PLACEHOLDER, ": ")
}

fn parse_hex_field(value: &str, field: &'static str, optional: bool) -> Result<u32, ParseError> {
    if value.is_empty() && optional {
        return Ok(0);
    }
    u32::from_str_radix(value, 16).map_err(|_| ParseError::MalformedHex {
        field,
        value: value.to_string(),
    })
}
