use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::combat_log::LogParser;
use crate::encounter::Encounter;
use crate::signal_processor::{GameSignal, SignalHandler};

use super::{CombatantReconciler, CombatantSnapshot, CombatantStats};

const ALPHA: i32 = 0x1000_0001;
const BRAVO: i32 = 0x1000_0002;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap() + TimeDelta::seconds(secs)
}

fn snap(player_id: i32, upstream: &str, damage: i32, secs: i64) -> CombatantSnapshot {
    CombatantSnapshot {
        player_id,
        name: "Alpha".into(),
        world: String::new(),
        job: "BLM".into(),
        stats: CombatantStats {
            damage,
            hits: damage / 10,
            ..Default::default()
        },
        upstream_encounter_id: upstream.into(),
        time: at(secs),
    }
}

fn reconciler() -> CombatantReconciler {
    CombatantReconciler::new(TimeDelta::seconds(2))
}

fn damages(rows: &[CombatantSnapshot]) -> Vec<i32> {
    rows.iter().map(|r| r.stats.damage).collect()
}

#[test]
fn test_same_upstream_id_appends_cumulative_rows() {
    let mut r = reconciler();
    assert!(r.update(snap(ALPHA, "1", 10, 0)));
    assert!(r.update(snap(ALPHA, "1", 20, 5)));
    assert_eq!(damages(&r.timeline()), vec![10, 20]);
    assert_eq!(damages(&r.latest_per_player()), vec![20]);
}

#[test]
fn test_upstream_restart_is_bridged() {
    let mut r = reconciler();
    r.update(snap(BRAVO, "1", 50, 0));
    r.update(snap(BRAVO, "2", 15, 5));
    assert_eq!(damages(&r.timeline()), vec![50, 65]);

    // later rows in the new epoch keep the same offset
    r.update(snap(BRAVO, "2", 30, 10));
    assert_eq!(damages(&r.timeline()), vec![50, 65, 80]);
    assert_eq!(r.timeline()[2].stats.hits, 3 + 5);
}

#[test]
fn test_repeated_restarts_accumulate() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 50, 0));
    r.update(snap(ALPHA, "2", 15, 5));
    r.update(snap(ALPHA, "3", 5, 10));
    assert_eq!(damages(&r.timeline()), vec![50, 65, 70]);
}

#[test]
fn test_snapshots_within_window_coalesce() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 10, 0));
    r.update(snap(ALPHA, "1", 12, 1));
    r.update(snap(ALPHA, "1", 14, 1));
    assert_eq!(damages(&r.timeline()), vec![14]);
    assert_eq!(r.timeline()[0].time, at(1));
}

#[test]
fn test_restart_inside_window_still_appends() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 50, 0));
    r.update(snap(ALPHA, "2", 10, 1));
    assert_eq!(damages(&r.timeline()), vec![50, 60]);
}

#[test]
fn test_late_snapshot_is_dropped() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 20, 10));
    assert!(!r.update(snap(ALPHA, "1", 10, 5)));
    assert_eq!(damages(&r.timeline()), vec![20]);
}

#[test]
fn test_non_player_ids_are_ignored() {
    let mut r = reconciler();
    assert!(!r.update(snap(0x4000_0001, "1", 10, 0)));
    assert!(!r.update(snap(0x0FFF_FFFF, "1", 10, 0)));
    assert!(r.is_empty());
}

#[test]
fn test_jobless_snapshot_becomes_limit_break() {
    let mut r = reconciler();
    let mut lb = snap(ALPHA, "1", 9000, 3);
    lb.job.clear();
    assert!(!r.update(lb.clone()), "no history yet");

    r.update(snap(ALPHA, "1", 10, 0));
    assert!(r.update(lb));
    let latest = r.latest_per_player();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].job, "BLM");
    assert_eq!(latest[0].stats.damage, 10);
    assert_eq!(latest[1].name, "Limit Break");
    assert_eq!(latest[1].job, "LB");
    assert_eq!(latest[1].stats.damage, 9000);
}

#[test]
fn test_take_updated_drains_changed_players() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 10, 0));
    r.update(snap(BRAVO, "1", 30, 0));
    assert_eq!(damages(&r.take_updated()), vec![10, 30]);
    assert!(r.take_updated().is_empty());

    r.update(snap(BRAVO, "1", 40, 5));
    let updated = r.take_updated();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].player_id, BRAVO);
    assert_eq!(updated[0].stats.damage, 40);
}

#[test]
fn test_total_damage_sums_latest() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "1", 10, 0));
    r.update(snap(ALPHA, "1", 25, 5));
    r.update(snap(BRAVO, "1", 30, 0));
    assert_eq!(r.total_damage(), 55);
}

#[test]
fn test_reset_continues_from_carried_reading() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "7", 100, 0));
    r.reset();
    assert!(r.is_empty());

    // the source did not restart its counters
    r.update(snap(ALPHA, "7", 130, 10));
    assert_eq!(damages(&r.timeline()), vec![30]);
}

#[test]
fn test_reset_with_new_upstream_id_starts_at_zero_offset() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "7", 100, 0));
    r.reset();
    r.update(snap(ALPHA, "8", 20, 10));
    assert_eq!(damages(&r.timeline()), vec![20]);
}

#[test]
fn test_encounter_start_signal_resets() {
    let mut r = reconciler();
    r.update(snap(ALPHA, "7", 100, 0));
    let signal = GameSignal::EncounterStarted {
        encounter_id: "next".into(),
        timestamp: at(5),
    };
    r.handle_signal(&signal, &Encounter::new());
    assert!(r.is_empty());
    r.update(snap(ALPHA, "7", 110, 10));
    assert_eq!(damages(&r.latest_per_player()), vec![10]);
}

#[test]
fn test_local_alias_is_enriched() {
    let mut r = reconciler();
    let mut you = snap(ALPHA, "1", 10, 0);
    you.name = "YOU".into();
    r.update(you);
    assert_eq!(r.latest_per_player()[0].name, "YOU");

    let event =
        LogParser::parse_line("[21:00:00.000] 00:FFFF:Alpha Tester:Balmung", at(1)).unwrap();
    r.read_event(&event);
    let row = &r.latest_per_player()[0];
    assert_eq!(row.name, "Alpha Tester");
    assert_eq!(row.world, "Balmung");
}

#[test]
fn test_other_players_keep_their_world() {
    let mut r = reconciler();
    let mut other = snap(BRAVO, "1", 10, 0);
    other.name = "Bravo".into();
    r.update(other);
    let event =
        LogParser::parse_line("[21:00:00.000] 00:FFFF:Alpha Tester:Balmung", at(1)).unwrap();
    r.read_event(&event);
    let row = &r.latest_per_player()[0];
    assert_eq!(row.name, "Bravo");
    assert_eq!(row.world, "");
}
