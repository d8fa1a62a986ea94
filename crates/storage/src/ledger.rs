// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event ledger with cross-process locking.
//!
//! One JSON object per line: `{"seq": N, "event": {...}}`. Writers append a
//! complete line and fsync while holding an exclusive lock on the sidecar
//! `<ledger>.lock` file; readers catch up under a shared lock. A torn final
//! line can therefore only be the artifact of a crashed writer, and is
//! truncated away by the next writer.
//!
//! The lock lives in [`StoreLock`], separate from the [`Ledger`] file state,
//! so a held guard does not pin the ledger borrow.

use crate::error::StoreError;
use fs2::FileExt;
use gaffer_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One ledger line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub seq: u64,
    pub event: Event,
}

/// The sidecar lock file serializing store access across processes.
pub(crate) struct StoreLock {
    file: File,
}

/// Held lock; unlocks on drop. A process crash releases it via the OS.
pub(crate) struct LockGuard<'a> {
    file: &'a File,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}

impl StoreLock {
    /// Open (or create) `<ledger>.lock` next to the ledger.
    pub fn open(ledger_path: &Path) -> Result<Self, StoreError> {
        let mut name = ledger_path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(ledger_path.with_file_name(name))?;
        Ok(Self { file })
    }

    /// Take the exclusive write lock. Blocks until granted.
    ///
    /// Qualified `FileExt` calls avoid ambiguity with the std file-lock API.
    pub fn exclusive(&self) -> Result<LockGuard<'_>, StoreError> {
        FileExt::lock_exclusive(&self.file)?;
        Ok(LockGuard { file: &self.file })
    }

    /// Take a shared read lock. Blocks until granted.
    pub fn shared(&self) -> Result<LockGuard<'_>, StoreError> {
        FileExt::lock_shared(&self.file)?;
        Ok(LockGuard { file: &self.file })
    }
}

pub(crate) struct Ledger {
    path: PathBuf,
    file: File,
    /// Bytes replayed so far; the resume point for incremental catch-up.
    offset: u64,
    /// Next sequence number to assign.
    next_seq: u64,
    /// A torn tail was seen past `offset` during the last catch-up.
    torn_tail: bool,
}

impl Ledger {
    /// Open (or create) the ledger at `path`. Does not replay; callers run
    /// `catch_up` under a lock before first use.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: 0,
            next_seq: 1,
            torn_tail: false,
        })
    }

    /// Replay entries appended since the last catch-up.
    ///
    /// Must be called with the lock held (shared is enough). Stops at a torn
    /// or unparseable tail without advancing past it; the next exclusive
    /// writer truncates it.
    pub fn catch_up(
        &mut self,
        mut apply: impl FnMut(u64, &Event),
    ) -> Result<(), StoreError> {
        let end = self.file.metadata()?.len();
        if end == self.offset {
            self.torn_tail = false;
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(&self.file);
        let mut buf = Vec::new();
        self.torn_tail = false;

        while self.offset < end {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') {
                // Incomplete final line from a crashed writer.
                self.torn_tail = true;
                break;
            }
            let entry: Entry = match serde_json::from_slice(&buf) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        offset = self.offset,
                        error = %e,
                        "stopping replay at unparseable ledger line"
                    );
                    self.torn_tail = true;
                    break;
                }
            };
            apply(entry.seq, &entry.event);
            self.next_seq = entry.seq + 1;
            self.offset += n as u64;
        }

        Ok(())
    }

    /// Append one event as a complete, fsynced line and return its sequence
    /// number. Requires the exclusive lock; truncates any torn tail first.
    pub fn append(&mut self, event: &Event) -> Result<u64, StoreError> {
        if self.torn_tail {
            tracing::warn!(
                path = %self.path.display(),
                offset = self.offset,
                "truncating torn ledger tail"
            );
            self.file.set_len(self.offset)?;
            self.torn_tail = false;
        }

        let seq = self.next_seq;
        let entry = Entry { seq, event: event.clone() };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(&line)?;
        self.file.sync_data()?;

        self.offset += line.len() as u64;
        self.next_seq += 1;
        Ok(seq)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
