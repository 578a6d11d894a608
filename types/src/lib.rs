//! Shared configuration types for parsecast
//!
//! This crate contains serializable configuration types that are shared between
//! the pipeline (parsecast-core) and the daemon binary.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_UDP_PORT: u16 = 31593;
pub const DEFAULT_PUBLISH_INTERVAL_MS: u64 = 1000;
pub const PROTOCOL_VERSION_MIN: i32 = 1;
pub const PROTOCOL_VERSION_MAX: i32 = 1;

/// NPC dialogue chat channel; a boss speaking while a wipe is pending cancels the wipe.
pub const GAME_LOG_NPC_DIALOGUE: u16 = 0x0044;

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_publish_interval_ms() -> u64 {
    DEFAULT_PUBLISH_INTERVAL_MS
}

fn default_min_protocol_version() -> i32 {
    PROTOCOL_VERSION_MIN
}

fn default_max_protocol_version() -> i32 {
    PROTOCOL_VERSION_MAX
}

fn default_boss_dialogue_types() -> Vec<u16> {
    vec![GAME_LOG_NPC_DIALOGUE]
}

// ─────────────────────────────────────────────────────────────────────────────
// Encounter Timings
// ─────────────────────────────────────────────────────────────────────────────

/// Timers driving the encounter state machine and the combatant reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterTimings {
    /// How long a "one team is down" condition must hold before the fight is resolved.
    pub wipe_grace_ms: u64,
    /// Force-end an active encounter after this long without a qualifying event.
    pub inactivity_timeout_ms: u64,
    /// Encounters shorter than this are not persisted.
    pub min_duration_ms: u64,
    /// Encounters longer than this are presumed corrupt and not persisted.
    pub max_duration_ms: u64,
    /// Combatant snapshots closer together than this replace each other.
    pub coalesce_window_ms: u64,
}

impl Default for EncounterTimings {
    fn default() -> Self {
        Self {
            wipe_grace_ms: 10_000,
            inactivity_timeout_ms: 120_000,
            min_duration_ms: 5_000,
            max_duration_ms: 4 * 60 * 60 * 1000,
            coalesce_window_ms: 2_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Timings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimings {
    /// A session task stops after this long without a packet from its source.
    pub inactivity_timeout_ms: u64,
    /// Packets buffered per session before the receive loop starts dropping.
    pub inbox_capacity: usize,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 5 * 60 * 1000,
            inbox_capacity: 512,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upload Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Maps an opaque upload key to the identity that owns the published data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadKeyEntry {
    pub key: String,
    pub owner: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    #[serde(default)]
    pub dev_mode: bool,
    /// Root of the encounter archive and the log file. Empty means platform default.
    #[serde(default)]
    pub data_directory: String,
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
    #[serde(default = "default_min_protocol_version")]
    pub min_protocol_version: i32,
    #[serde(default = "default_max_protocol_version")]
    pub max_protocol_version: i32,
    #[serde(default)]
    pub timings: EncounterTimings,
    #[serde(default)]
    pub session: SessionTimings,
    #[serde(default)]
    pub upload_keys: Vec<UploadKeyEntry>,
    /// Game log sub-types treated as "the boss is talking".
    #[serde(default = "default_boss_dialogue_types")]
    pub boss_dialogue_types: Vec<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            dev_mode: false,
            data_directory: String::new(),
            publish_interval_ms: DEFAULT_PUBLISH_INTERVAL_MS,
            min_protocol_version: PROTOCOL_VERSION_MIN,
            max_protocol_version: PROTOCOL_VERSION_MAX,
            timings: EncounterTimings::default(),
            session: SessionTimings::default(),
            upload_keys: Vec::new(),
            boss_dialogue_types: default_boss_dialogue_types(),
        }
    }
}

impl ServerConfig {
    /// Telemetry source protocol versions the handshake accepts.
    pub fn protocol_versions(&self) -> std::ops::RangeInclusive<i32> {
        self.min_protocol_version..=self.max_protocol_version
    }
}
