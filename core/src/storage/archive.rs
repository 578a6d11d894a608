use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::state::FinishedEncounter;
use crate::wire::{CombatantRecord, EncounterRecord, WireRecord};

use super::log_lines::LogLineArchive;
use super::{StorageError, owner_dir_name, path_component};

pub const ENCOUNTER_FILE: &str = "encounter.bin";
pub const COMBATANTS_FILE: &str = "combatants.bin";
pub const LOG_LINES_FILE: &str = "log_lines.bin";

/// Writes finished encounters to `<root>/<owner>/<encounter_id>/`.
#[derive(Debug, Clone)]
pub struct EncounterArchive {
    root: PathBuf,
}

impl EncounterArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn encounter_dir(&self, owner: &str, encounter_id: &str) -> PathBuf {
        self.root
            .join(owner_dir_name(owner))
            .join(path_component(encounter_id))
    }

    /// Write all three files. Returns the encounter directory.
    pub fn write(&self, owner: &str, finished: &FinishedEncounter) -> Result<PathBuf, StorageError> {
        let dir = self.encounter_dir(owner, &finished.encounter.id);
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        write_file(&dir.join(ENCOUNTER_FILE), &finished.encounter.encode())?;

        let mut framed = Vec::new();
        for row in &finished.combatants {
            let encoded = row.encode();
            framed.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
            framed.extend_from_slice(&encoded);
        }
        write_file(&dir.join(COMBATANTS_FILE), &framed)?;

        let lines_path = dir.join(LOG_LINES_FILE);
        if lines_path.exists() {
            fs::remove_file(&lines_path).map_err(|source| StorageError::Write {
                path: lines_path.clone(),
                source,
            })?;
        }
        LogLineArchive::open(&lines_path)?.append_all(&finished.log_lines)?;

        debug!(
            path = %dir.display(),
            combatants = finished.combatants.len(),
            log_lines = finished.log_lines.len(),
            "Archived encounter"
        );
        Ok(dir)
    }

    /// Load an encounter directory written by `write`.
    pub fn load(dir: impl AsRef<Path>) -> Result<FinishedEncounter, StorageError> {
        let dir = dir.as_ref();
        let encounter = EncounterRecord::decode(&read_file(&dir.join(ENCOUNTER_FILE))?)?;

        let combatants_path = dir.join(COMBATANTS_FILE);
        let framed = read_file(&combatants_path)?;
        let mut combatants = Vec::new();
        let mut rest = framed.as_slice();
        while !rest.is_empty() {
            let Some((len, body)) = rest.split_first_chunk::<4>() else {
                return Err(StorageError::Corrupt {
                    path: combatants_path,
                    reason: "truncated frame header".into(),
                });
            };
            let len = u32::from_be_bytes(*len) as usize;
            if body.len() < len {
                return Err(StorageError::Corrupt {
                    path: combatants_path,
                    reason: format!("frame of {len} bytes, {} left", body.len()),
                });
            }
            combatants.push(CombatantRecord::decode(&body[..len])?);
            rest = &body[len..];
        }

        let log_lines = LogLineArchive::open(dir.join(LOG_LINES_FILE))?.read_all()?;

        Ok(FinishedEncounter {
            encounter,
            combatants,
            log_lines,
        })
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    fs::write(path, bytes).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, StorageError> {
    fs::read(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::EncounterOutcome;
    use crate::wire::LogLineRecord;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn finished() -> FinishedEncounter {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap();
        let combatant = |name: &str, damage| CombatantRecord {
            encounter_id: "e1".into(),
            player_id: 0x1000_0001,
            name: name.into(),
            world: "Balmung".into(),
            job: "BLM".into(),
            damage,
            damage_taken: 5,
            damage_healed: 0,
            deaths: 0,
            hits: 3,
            heals: 0,
            kills: 1,
            time: start,
        };
        FinishedEncounter {
            encounter: EncounterRecord {
                id: "e1".into(),
                start_time: start,
                end_time: start + TimeDelta::seconds(90),
                zone: "The Navel".into(),
                damage: 300,
                active: false,
                outcome: EncounterOutcome::Clear,
            },
            combatants: vec![combatant("Alpha", 100), combatant("Alpha", 300)],
            log_lines: (0..3)
                .map(|n| LogLineRecord {
                    encounter_id: "e1".into(),
                    time: start + TimeDelta::seconds(n),
                    raw: format!("[21:00:0{n}.000] 15:line {n}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EncounterArchive::new(dir.path());
        let written = archive.write("alice", &finished()).unwrap();
        assert_eq!(written, dir.path().join(owner_dir_name("alice")).join("e1"));
        assert!(written.join(ENCOUNTER_FILE).is_file());

        let loaded = EncounterArchive::load(&written).unwrap();
        assert_eq!(loaded, finished());
    }

    #[test]
    fn test_rewrite_replaces_log_lines() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EncounterArchive::new(dir.path());
        archive.write("alice", &finished()).unwrap();
        let written = archive.write("alice", &finished()).unwrap();
        assert_eq!(EncounterArchive::load(&written).unwrap().log_lines.len(), 3);
    }

    #[test]
    fn test_truncated_combatant_frame_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EncounterArchive::new(dir.path());
        let written = archive.write("alice", &finished()).unwrap();
        let path = written.join(COMBATANTS_FILE);
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 3);
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            EncounterArchive::load(&written),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_lookalike_owners_do_not_share_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EncounterArchive::new(dir.path());
        let first = archive.write("a/b", &finished()).unwrap();
        let second = archive.write("a_b", &finished()).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.parent().unwrap().parent().unwrap(), dir.path());
        assert!(EncounterArchive::load(&first).is_ok());
        assert!(EncounterArchive::load(&second).is_ok());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EncounterArchive::load(dir.path().join("nope")),
            Err(StorageError::Read { .. })
        ));
    }
}
