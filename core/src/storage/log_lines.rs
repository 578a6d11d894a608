use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::wire::{LogLineRecord, WireRecord, truncate_str};

use super::StorageError;

/// Every encoded line is zero-padded to this many bytes.
pub const LOG_LINE_RECORD_SIZE: usize = 4096;

/// Append-only file of log lines in fixed-size slots, so line `n` lives at
/// `n * LOG_LINE_RECORD_SIZE`.
pub struct LogLineArchive {
    path: PathBuf,
    file: File,
}

impl LogLineArchive {
    /// Open for appending and reading, creating the file if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        let archive = Self { path, file };
        archive.len()?;
        Ok(archive)
    }

    /// Number of lines stored.
    pub fn len(&self) -> Result<u64, StorageError> {
        let bytes = self
            .file
            .metadata()
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?
            .len();
        if bytes % LOG_LINE_RECORD_SIZE as u64 != 0 {
            return Err(StorageError::Corrupt {
                path: self.path.clone(),
                reason: format!("size {bytes} is not a multiple of {LOG_LINE_RECORD_SIZE}"),
            });
        }
        Ok(bytes / LOG_LINE_RECORD_SIZE as u64)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Append one line; raw text that would overflow the slot is truncated.
    pub fn append(&mut self, line: &LogLineRecord) -> Result<(), StorageError> {
        let slot = encode_slot(line);
        self.file
            .write_all(&slot)
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })
    }

    pub fn append_all<'a>(
        &mut self,
        lines: impl IntoIterator<Item = &'a LogLineRecord>,
    ) -> Result<(), StorageError> {
        for line in lines {
            self.append(line)?;
        }
        self.file.flush().map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Read line `index` without touching the others.
    pub fn read_at(&mut self, index: u64) -> Result<LogLineRecord, StorageError> {
        let len = self.len()?;
        if index >= len {
            return Err(StorageError::OutOfRange { index, len });
        }

        let mut slot = vec![0u8; LOG_LINE_RECORD_SIZE];
        self.file
            .seek(SeekFrom::Start(index * LOG_LINE_RECORD_SIZE as u64))
            .and_then(|_| self.file.read_exact(&mut slot))
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?;
        Ok(LogLineRecord::decode(&slot)?)
    }

    pub fn read_all(&mut self) -> Result<Vec<LogLineRecord>, StorageError> {
        (0..self.len()?).map(|index| self.read_at(index)).collect()
    }
}

fn encode_slot(line: &LogLineRecord) -> Vec<u8> {
    let mut encoded = line.encode();
    if encoded.len() > LOG_LINE_RECORD_SIZE {
        let overhead = LogLineRecord {
            raw: String::new(),
            ..line.clone()
        }
        .encode()
        .len();
        let fitted = LogLineRecord {
            raw: truncate_str(&line.raw, LOG_LINE_RECORD_SIZE.saturating_sub(overhead)).to_string(),
            ..line.clone()
        };
        encoded = fitted.encode();
    }
    encoded.resize(LOG_LINE_RECORD_SIZE, 0);
    encoded
}
