//! Database directory layout.
//!
//! ```text
//! <db_path>/
//! ├─ LOCK          # Advisory lock, held while the database is open
//! └─ journal.log   # Commit journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "journal.log";

/// An opened database directory.
///
/// Holds an exclusive lock on `LOCK` for as long as it lives, so at most
/// one handle per directory exists at a time.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens a database directory, creating it if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the path is missing (and may
    /// not be created) or is not a directory, and
    /// [`CoreError::DatabaseLocked`] if another handle holds the lock.
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(CoreError::invalid_format(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the commit journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }

    /// True until the first commit has been journaled.
    #[must_use]
    pub fn is_new_database(&self) -> bool {
        fs::metadata(self.journal_path()).map_or(true, |meta| meta.len() == 0)
    }
}
