//! Journal damage helpers for recovery tests.
//!
//! A [`SharedJournal`] is an in-memory journal that outlives the databases
//! opened over it, the way a file outlives a process. Tests commit through
//! one handle, damage the bytes, and open a fresh handle to see what
//! recovery makes of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kairos_testkit::crash::SharedJournal;
//!
//! let journal = SharedJournal::new();
//! let db = journal.open().unwrap();
//! // ... commit some work, then drop `db`
//! journal.tear(3);
//! let recovered = journal.open().unwrap();
//! ```

use kairos_core::{Config, CoreResult, Database};
use kairos_storage::{InMemoryBackend, StorageBackend};
use std::fs::OpenOptions;
use std::path::Path;

/// An in-memory journal shared by every database opened over it.
#[derive(Debug, Clone, Default)]
pub struct SharedJournal {
    backend: InMemoryBackend,
}

impl SharedJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a database over the journal with default settings.
    pub fn open(&self) -> CoreResult<Database> {
        self.open_with_config(Config::default())
    }

    /// Opens a database over the journal.
    pub fn open_with_config(&self, config: Config) -> CoreResult<Database> {
        Database::open_with_backend(config, Box::new(self.backend.clone()))
    }

    /// Current journal size in bytes.
    pub fn len(&self) -> u64 {
        self.backend.data().len() as u64
    }

    /// Whether nothing has been journaled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the journal bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.backend.data()
    }

    /// Makes later appends fail, as a full disk would.
    pub fn reject_appends(&self, reject: bool) {
        self.backend.reject_appends(reject);
    }

    /// Cuts `bytes` off the end, as a crash mid-write would.
    pub fn tear(&self, bytes: u64) {
        let mut backend = self.backend.clone();
        let size = backend.size().expect("Failed to read journal size");
        backend
            .truncate(size.saturating_sub(bytes))
            .expect("Failed to truncate journal");
    }

    /// Inverts one byte in place.
    pub fn flip_byte(&self, offset: usize) {
        let mut data = self.bytes();
        data[offset] ^= 0xFF;
        self.replace(&data);
    }

    /// Appends raw bytes after the last frame.
    pub fn append_raw(&self, bytes: &[u8]) {
        let mut backend = self.backend.clone();
        backend.append(bytes).expect("Failed to append to journal");
    }

    fn replace(&self, data: &[u8]) {
        let mut backend = self.backend.clone();
        backend.truncate(0).expect("Failed to clear journal");
        backend.append(data).expect("Failed to rewrite journal");
    }
}

/// Cuts `bytes` off the end of a file-backed database's journal.
///
/// The database must be closed.
pub fn tear_journal_file(db_path: &Path, bytes: u64) {
    let journal = db_path.join("journal.log");
    let file = OpenOptions::new()
        .write(true)
        .open(&journal)
        .expect("Failed to open journal file");
    let size = file.metadata().expect("Failed to stat journal").len();
    file.set_len(size.saturating_sub(bytes))
        .expect("Failed to truncate journal file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::NewUser;

    #[test]
    fn test_journal_outlives_database() {
        let journal = SharedJournal::new();
        {
            let db = journal.open().unwrap();
            db.create_user(NewUser::new("ada", "ada@example.com")).unwrap();
        }
        assert!(!journal.is_empty());
        let db = journal.open().unwrap();
        assert!(db.find_user_by_username("ada").is_some());
    }

    #[test]
    fn test_flip_byte_changes_one_byte() {
        let journal = SharedJournal::new();
        journal.append_raw(&[1, 2, 3]);
        journal.flip_byte(1);
        assert_eq!(journal.bytes(), vec![1, 0xFD, 3]);
        journal.tear(2);
        assert_eq!(journal.bytes(), vec![1]);
    }
}
