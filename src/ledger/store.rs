//! Durable pending-job ledger backed by one plain-text file per group.
//!
//! Each group owns `<root>/<group>/PendingJobs.txt`. Saves go through a
//! temporary file in the same directory followed by an atomic rename, so a
//! crash mid-write leaves either the old file or the new one, never a
//! half-written ledger.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ledger::entry::PendingEntry;

/// File name of the per-group ledger.
pub const PENDING_FILE_NAME: &str = "PendingJobs.txt";

/// Per-group pending-job ledger rooted at a base directory.
///
/// Callers that read-modify-write a group's ledger must hold the group lock
/// from [`FileLedger::lock_group`] across the whole sequence.
#[derive(Debug)]
pub struct FileLedger {
    root: PathBuf,
    group_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            group_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Serializes read-modify-write sequences on one group's ledger file.
    pub async fn lock_group(&self, group: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .group_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(group.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Loads the pending entries of a group. A missing ledger file is an
    /// empty set; a malformed line is a hard error so a corrupt ledger is
    /// never silently truncated.
    pub fn load(&self, group: &str) -> Result<BTreeSet<PendingEntry>> {
        validate_group(group)?;
        let path = self.pending_path(group);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeSet::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read ledger at {}", path.display()));
            }
        };

        let mut entries = BTreeSet::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = PendingEntry::parse(line)
                .with_context(|| format!("corrupt ledger line in {}", path.display()))?;
            entries.insert(entry);
        }
        Ok(entries)
    }

    /// Replaces a group's ledger file with the given entry set, atomically.
    pub fn save(&self, group: &str, entries: &BTreeSet<PendingEntry>) -> Result<()> {
        validate_group(group)?;
        let dir = self.group_dir(group);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create group directory {}", dir.display()))?;

        let path = dir.join(PENDING_FILE_NAME);
        let mut file = NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temporary ledger in {}", dir.display()))?;
        for entry in entries {
            writeln!(file, "{}", entry.to_line())
                .context("failed to write ledger entry to temporary file")?;
        }
        file.flush().context("failed to flush temporary ledger")?;
        file.as_file()
            .sync_all()
            .context("failed to sync temporary ledger to disk")?;
        file.persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace ledger at {}", path.display()))?;
        Ok(())
    }

    /// Removes a group's ledger file. Missing files are fine.
    pub fn clear(&self, group: &str) -> Result<()> {
        validate_group(group)?;
        let path = self.pending_path(group);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove ledger at {}", path.display()))
            }
        }
    }

    pub fn pending_path(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(PENDING_FILE_NAME)
    }

    fn group_dir(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }
}

fn validate_group(group: &str) -> Result<()> {
    if group.is_empty() {
        bail!("group name must not be empty");
    }
    if group == ".." || group.contains('/') || group.contains('\\') {
        bail!("group name must be a plain directory name: {group:?}");
    }
    Ok(())
}
