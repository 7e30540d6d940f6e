//! Rollback journal written before a multi-collection commit.
//!
//! The journal holds the prior contents of every collection a commit is
//! about to replace. Its presence on disk means the commit did not finish.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{write_atomic, RecordKind};

const JOURNAL_FILE: &str = ".fleetdesk-journal.json";

/// Snapshot of one collection taken before it is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JournalEntry {
    pub kind: RecordKind,
    /// Previous file contents, `None` when the file did not exist.
    pub previous: Option<String>,
}

/// Prior state of the collections touched by an in-flight commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RollbackJournal {
    pub started_at: DateTime<Utc>,
    pub entries: Vec<JournalEntry>,
}

impl RollbackJournal {
    /// Capture the current contents of each `(kind, path)` pair.
    pub fn capture<'a>(targets: impl IntoIterator<Item = (RecordKind, &'a Path)>) -> Result<Self> {
        let mut entries = Vec::new();
        for (kind, path) in targets {
            let previous = if path.exists() {
                Some(
                    fs::read_to_string(path)
                        .with_context(|| format!("failed to snapshot {}", path.display()))?,
                )
            } else {
                None
            };
            entries.push(JournalEntry { kind, previous });
        }
        Ok(Self {
            started_at: Utc::now(),
            entries,
        })
    }

    /// Load the journal at `path`, returning `None` if there is none.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read journal {}", path.display()))?;
        let journal = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse journal {}", path.display()))?;
        Ok(Some(journal))
    }

    /// Durably write the journal to `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let serialized =
            serde_json::to_vec_pretty(self).context("failed to serialize rollback journal")?;
        write_atomic(path, &serialized)
            .with_context(|| format!("failed to write journal {}", path.display()))
    }

    /// Delete the journal at `path`; a missing file is not an error.
    pub fn discard(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove journal {}", path.display()))
            }
        }
    }
}

/// Journal location inside a data directory.
pub(crate) fn journal_path(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join(JOURNAL_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn capture_persist_and_load() -> Result<()> {
        let dir = tempdir()?;
        let existing = dir.path().join("vehicles.csv");
        fs::write(&existing, "vehicle_id,type,status\n")?;
        let missing = dir.path().join("bookings.csv");

        let journal = RollbackJournal::capture([
            (RecordKind::Vehicles, existing.as_path()),
            (RecordKind::Bookings, missing.as_path()),
        ])?;
        let path = journal_path(dir.path());
        journal.persist(&path)?;

        let loaded = RollbackJournal::load(&path)?.expect("journal should exist");
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.entries[0].previous.as_deref(),
            Some("vehicle_id,type,status\n")
        );
        assert_eq!(loaded.entries[1].kind, RecordKind::Bookings);
        assert!(loaded.entries[1].previous.is_none());

        RollbackJournal::discard(&path)?;
        assert!(RollbackJournal::load(&path)?.is_none());
        RollbackJournal::discard(&path)?;
        Ok(())
    }
}
