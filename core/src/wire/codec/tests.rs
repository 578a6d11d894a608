use super::*;
use crate::encounter::EncounterOutcome;
use crate::wire::{
    CombatantRecord, EncounterRecord, FlagRecord, LogLineRecord, Packet, SessionRecord,
    WireRecord, tag,
};
use chrono::TimeZone;

const VERSIONS: std::ops::RangeInclusive<i32> = 1..=3;

fn zero_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 21, 15, 42).unwrap() + chrono::Duration::nanoseconds(123_456_789)
}

fn sample_combatant() -> CombatantRecord {
    CombatantRecord {
        encounter_id: "77".to_string(),
        player_id: 0x1000_00AB,
        name: "Alpha Tester".to_string(),
        world: "Balmung".to_string(),
        job: "Whm".to_string(),
        damage: 120_000,
        damage_taken: 45_000,
        damage_healed: 300_000,
        deaths: 1,
        hits: 240,
        heals: 88,
        kills: 0,
        time: sample_time(),
    }
}

#[test]
fn test_session_round_trip() {
    let record = SessionRecord {
        version: 2,
        upload_key: "k3y-abc".to_string(),
    };
    let decoded = SessionRecord::decode_checked(&record.encode(), &VERSIONS).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn test_session_rejects_version_outside_range() {
    for version in [0, 4, -1] {
        let record = SessionRecord {
            version,
            upload_key: "key".to_string(),
        };
        let err = SessionRecord::decode_checked(&record.encode(), &VERSIONS).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion { .. }), "{version}");
    }
}

#[test]
fn test_session_accepts_range_bounds() {
    for version in [1, 3] {
        let record = SessionRecord {
            version,
            upload_key: String::new(),
        };
        assert!(SessionRecord::decode_checked(&record.encode(), &VERSIONS).is_ok());
    }
}

#[test]
fn test_encounter_round_trip_each_outcome() {
    for outcome in [
        EncounterOutcome::UnknownEnd,
        EncounterOutcome::Clear,
        EncounterOutcome::Wipe,
        EncounterOutcome::LegacyWipe,
    ] {
        let record = EncounterRecord {
            id: "2b1f0a3c-0000-4000-8000-000000000001".to_string(),
            start_time: sample_time(),
            end_time: sample_time() + chrono::Duration::seconds(300),
            zone: "The Weapon's Refrain (Ultimate)".to_string(),
            damage: 9_876_543,
            active: false,
            outcome,
        };
        assert_eq!(EncounterRecord::decode(&record.encode()).unwrap(), record);
    }
}

#[test]
fn test_encounter_round_trip_empty_fields_and_zero_time() {
    let record = EncounterRecord {
        id: String::new(),
        start_time: zero_time(),
        end_time: zero_time(),
        zone: String::new(),
        damage: 0,
        active: true,
        outcome: EncounterOutcome::UnknownEnd,
    };
    assert_eq!(EncounterRecord::decode(&record.encode()).unwrap(), record);
}

#[test]
fn test_encounter_rejects_unknown_outcome() {
    let record = EncounterRecord {
        id: "x".to_string(),
        start_time: zero_time(),
        end_time: zero_time(),
        zone: "z".to_string(),
        damage: 0,
        active: false,
        outcome: EncounterOutcome::Clear,
    };
    let mut bytes = record.encode();
    *bytes.last_mut().unwrap() = 9;
    assert!(matches!(
        EncounterRecord::decode(&bytes),
        Err(CodecError::InvalidOutcome(9))
    ));
}

#[test]
fn test_combatant_round_trip() {
    let record = sample_combatant();
    assert_eq!(CombatantRecord::decode(&record.encode()).unwrap(), record);
}

#[test]
fn test_combatant_round_trip_negative_and_extreme_counters() {
    let record = CombatantRecord {
        player_id: i32::MIN,
        damage: i32::MAX,
        damage_taken: -1,
        ..sample_combatant()
    };
    assert_eq!(CombatantRecord::decode(&record.encode()).unwrap(), record);
}

#[test]
fn test_log_line_round_trip_max_length() {
    let record = LogLineRecord {
        encounter_id: "e".to_string(),
        time: sample_time(),
        raw: "a".repeat(LONG_STRING_MAX),
    };
    assert_eq!(LogLineRecord::decode(&record.encode()).unwrap(), record);
}

#[test]
fn test_log_line_truncates_over_limit() {
    let record = LogLineRecord {
        encounter_id: "e".to_string(),
        time: zero_time(),
        raw: "b".repeat(LONG_STRING_MAX + 10),
    };
    let decoded = LogLineRecord::decode(&record.encode()).unwrap();
    assert_eq!(decoded.raw.len(), LONG_STRING_MAX);
}

#[test]
fn test_short_strings_truncate_at_255() {
    let record = FlagRecord {
        name: "n".repeat(300),
        value: true,
    };
    let decoded = FlagRecord::decode(&record.encode()).unwrap();
    assert_eq!(decoded.name.len(), SHORT_STRING_MAX);
    assert!(decoded.value);
}

#[test]
fn test_truncate_respects_char_boundary() {
    // 'é' is two bytes; a 3-byte limit must not split the second one
    assert_eq!(truncate_str("éé", 3), "é");
    assert_eq!(truncate_str("abc", 10), "abc");
}

#[test]
fn test_flag_round_trip() {
    for value in [true, false] {
        let record = FlagRecord {
            name: "hide_chat".to_string(),
            value,
        };
        assert_eq!(FlagRecord::decode(&record.encode()).unwrap(), record);
    }
}

#[test]
fn test_wrong_tag_is_rejected() {
    let bytes = sample_combatant().encode();
    let err = EncounterRecord::decode(&bytes).unwrap_err();
    assert!(matches!(
        err,
        CodecError::WrongTag {
            expected: tag::ENCOUNTER,
            found: tag::COMBATANT
        }
    ));
}

#[test]
fn test_truncated_buffer_is_rejected() {
    let bytes = sample_combatant().encode();
    for cut in [1, 5, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(
                CombatantRecord::decode(&bytes[..cut]),
                Err(CodecError::Truncated { .. })
            ),
            "cut at {cut}"
        );
    }
}

#[test]
fn test_empty_buffer_is_rejected() {
    assert!(matches!(FlagRecord::decode(&[]), Err(CodecError::Empty)));
    assert!(matches!(Packet::decode(&[], &VERSIONS), Err(CodecError::Empty)));
}

#[test]
fn test_invalid_bool_is_rejected() {
    let mut bytes = FlagRecord {
        name: "x".to_string(),
        value: true,
    }
    .encode();
    *bytes.last_mut().unwrap() = 2;
    assert!(matches!(FlagRecord::decode(&bytes), Err(CodecError::InvalidBool(2))));
}

#[test]
fn test_bad_timestamp_is_rejected() {
    let mut w = ByteWriter::new(tag::LOG_LINE);
    w.put_str("enc", SHORT_STRING_MAX);
    w.put_str("yesterday", SHORT_STRING_MAX);
    w.put_str("raw", LONG_STRING_MAX);
    assert!(matches!(
        LogLineRecord::decode(&w.finish()),
        Err(CodecError::InvalidTimestamp { .. })
    ));
}

#[test]
fn test_packet_dispatch() {
    let packets = vec![
        Packet::Session(SessionRecord {
            version: 1,
            upload_key: "k".to_string(),
        }),
        Packet::Combatant(sample_combatant()),
        Packet::LogLine(LogLineRecord {
            encounter_id: "1".to_string(),
            time: sample_time(),
            raw: "[21:15:42.000] 00:0038::end".to_string(),
        }),
        Packet::Flag(FlagRecord {
            name: "f".to_string(),
            value: false,
        }),
    ];
    for packet in packets {
        let decoded = Packet::decode(&packet.encode(), &VERSIONS).unwrap();
        assert_eq!(decoded, packet);
    }
}

#[test]
fn test_packet_unknown_tag() {
    assert!(matches!(
        Packet::decode(&[42, 0, 0], &VERSIONS),
        Err(CodecError::UnknownTag(42))
    ));
}

#[test]
fn test_packet_session_version_gate() {
    let bytes = SessionRecord {
        version: 99,
        upload_key: "k".to_string(),
    }
    .encode();
    assert!(matches!(
        Packet::decode(&bytes, &VERSIONS),
        Err(CodecError::UnsupportedVersion { version: 99, .. })
    ));
}
