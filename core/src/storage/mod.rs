//! Flat-file archive of finished encounters.
//!
//! Each encounter is written to its own directory under `<data_dir>/<owner>/`:
//! `encounter.bin`, `combatants.bin` (length-framed records) and `log_lines.bin`
//! (fixed-size records, seekable by index).

mod archive;
mod error;
mod log_lines;

pub use archive::{COMBATANTS_FILE, ENCOUNTER_FILE, EncounterArchive, LOG_LINES_FILE};
pub use error::StorageError;
pub use log_lines::{LOG_LINE_RECORD_SIZE, LogLineArchive};

use std::path::PathBuf;

/// Default data directory, `~/.local/share/parsecast` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parsecast")
}

/// Reduce an arbitrary string to a single safe path component.
pub fn path_component(raw: &str) -> String {
    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.trim_matches('.') {
        "" => "_".to_string(),
        _ => name,
    }
}

/// Directory name for an owner: the readable component plus a CRC32 of the
/// raw identity, so owners that sanitize alike stay apart.
pub fn owner_dir_name(owner: &str) -> String {
    format!("{}-{:08x}", path_component(owner), crc32fast::hash(owner.as_bytes()))
}
