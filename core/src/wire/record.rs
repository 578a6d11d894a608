//! The five record kinds exchanged with telemetry sources and viewers.

use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;

use super::codec::{ByteReader, ByteWriter, LONG_STRING_MAX, SHORT_STRING_MAX};
use super::CodecError;
use crate::encounter::EncounterOutcome;

pub mod tag {
    pub const SESSION: u8 = 1;
    pub const ENCOUNTER: u8 = 2;
    pub const COMBATANT: u8 = 3;
    pub const LOG_LINE: u8 = 5;
    pub const FLAG: u8 = 99;
}

/// A record with a fixed type tag and binary layout.
pub trait WireRecord: Sized {
    const TAG: u8;

    fn write_fields(&self, w: &mut ByteWriter);

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError>;

    fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(Self::TAG);
        self.write_fields(&mut w);
        w.finish()
    }

    fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut r = ByteReader::open(buf, Self::TAG)?;
        Self::read_fields(&mut r)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Handshake sent by a telemetry source before anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub version: i32,
    pub upload_key: String,
}

impl SessionRecord {
    /// Decode and reject protocol versions outside `versions`.
    pub fn decode_checked(buf: &[u8], versions: &RangeInclusive<i32>) -> Result<Self, CodecError> {
        let record = Self::decode(buf)?;
        if !versions.contains(&record.version) {
            return Err(CodecError::UnsupportedVersion {
                version: record.version,
                min: *versions.start(),
                max: *versions.end(),
            });
        }
        Ok(record)
    }
}

impl WireRecord for SessionRecord {
    const TAG: u8 = tag::SESSION;

    fn write_fields(&self, w: &mut ByteWriter) {
        w.put_i32(self.version);
        w.put_str(&self.upload_key, SHORT_STRING_MAX);
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            version: r.i32()?,
            upload_key: r.string()?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encounter
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub zone: String,
    pub damage: i32,
    pub active: bool,
    pub outcome: EncounterOutcome,
}

impl WireRecord for EncounterRecord {
    const TAG: u8 = tag::ENCOUNTER;

    fn write_fields(&self, w: &mut ByteWriter) {
        w.put_str(&self.id, SHORT_STRING_MAX);
        w.put_time(&self.start_time);
        w.put_time(&self.end_time);
        w.put_str(&self.zone, SHORT_STRING_MAX);
        w.put_i32(self.damage);
        w.put_bool(self.active);
        w.put_u8(self.outcome.as_byte());
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.string()?,
            start_time: r.time()?,
            end_time: r.time()?,
            zone: r.string()?,
            damage: r.i32()?,
            active: r.bool()?,
            outcome: {
                let byte = r.u8()?;
                EncounterOutcome::from_byte(byte).ok_or(CodecError::InvalidOutcome(byte))?
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Combatant
// ─────────────────────────────────────────────────────────────────────────────

/// One row of combatant counters. Inbound the encounter id is the source's own
/// internal encounter id; outbound it is ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatantRecord {
    pub encounter_id: String,
    pub player_id: i32,
    pub name: String,
    pub world: String,
    pub job: String,
    pub damage: i32,
    pub damage_taken: i32,
    pub damage_healed: i32,
    pub deaths: i32,
    pub hits: i32,
    pub heals: i32,
    pub kills: i32,
    pub time: DateTime<Utc>,
}

impl WireRecord for CombatantRecord {
    const TAG: u8 = tag::COMBATANT;

    fn write_fields(&self, w: &mut ByteWriter) {
        w.put_str(&self.encounter_id, SHORT_STRING_MAX);
        w.put_i32(self.player_id);
        w.put_str(&self.name, SHORT_STRING_MAX);
        w.put_str(&self.world, SHORT_STRING_MAX);
        w.put_str(&self.job, SHORT_STRING_MAX);
        w.put_i32(self.damage);
        w.put_i32(self.damage_taken);
        w.put_i32(self.damage_healed);
        w.put_i32(self.deaths);
        w.put_i32(self.hits);
        w.put_i32(self.heals);
        w.put_i32(self.kills);
        w.put_time(&self.time);
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            encounter_id: r.string()?,
            player_id: r.i32()?,
            name: r.string()?,
            world: r.string()?,
            job: r.string()?,
            damage: r.i32()?,
            damage_taken: r.i32()?,
            damage_healed: r.i32()?,
            deaths: r.i32()?,
            hits: r.i32()?,
            heals: r.i32()?,
            kills: r.i32()?,
            time: r.time()?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log Line
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLineRecord {
    pub encounter_id: String,
    pub time: DateTime<Utc>,
    pub raw: String,
}

impl WireRecord for LogLineRecord {
    const TAG: u8 = tag::LOG_LINE;

    fn write_fields(&self, w: &mut ByteWriter) {
        w.put_str(&self.encounter_id, SHORT_STRING_MAX);
        w.put_time(&self.time);
        w.put_str(&self.raw, LONG_STRING_MAX);
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            encounter_id: r.string()?,
            time: r.time()?,
            raw: r.string()?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flag
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRecord {
    pub name: String,
    pub value: bool,
}

impl WireRecord for FlagRecord {
    const TAG: u8 = tag::FLAG;

    fn write_fields(&self, w: &mut ByteWriter) {
        w.put_str(&self.name, SHORT_STRING_MAX);
        w.put_bool(self.value);
    }

    fn read_fields(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.string()?,
            value: r.bool()?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Packet
// ─────────────────────────────────────────────────────────────────────────────

/// Any record, dispatched on its leading tag byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Session(SessionRecord),
    Encounter(EncounterRecord),
    Combatant(CombatantRecord),
    LogLine(LogLineRecord),
    Flag(FlagRecord),
}

impl Packet {
    /// Decode one datagram. Handshakes outside `versions` are rejected.
    pub fn decode(buf: &[u8], versions: &RangeInclusive<i32>) -> Result<Self, CodecError> {
        let Some(&tag) = buf.first() else {
            return Err(CodecError::Empty);
        };
        match tag {
            tag::SESSION => SessionRecord::decode_checked(buf, versions).map(Packet::Session),
            tag::ENCOUNTER => EncounterRecord::decode(buf).map(Packet::Encounter),
            tag::COMBATANT => CombatantRecord::decode(buf).map(Packet::Combatant),
            tag::LOG_LINE => LogLineRecord::decode(buf).map(Packet::LogLine),
            tag::FLAG => FlagRecord::decode(buf).map(Packet::Flag),
            other => Err(CodecError::UnknownTag(other)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Packet::Session(r) => r.encode(),
            Packet::Encounter(r) => r.encode(),
            Packet::Combatant(r) => r.encode(),
            Packet::LogLine(r) => r.encode(),
            Packet::Flag(r) => r.encode(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Session(_) => "session",
            Packet::Encounter(_) => "encounter",
            Packet::Combatant(_) => "combatant",
            Packet::LogLine(_) => "log_line",
            Packet::Flag(_) => "flag",
        }
    }
}
