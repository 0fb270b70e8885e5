//! Journal file backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct JournalFile {
    file: File,
    len: u64,
}

/// The journal of a database directory, kept in one file.
///
/// Bytes are only ever added at the end or cut off the end. The length is
/// tracked in memory alongside the handle. `flush()` hands buffered bytes
/// to the OS and `sync()` waits for them to reach the disk.
///
/// ```no_run
/// use kairos_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut journal = FileBackend::open(Path::new("db/journal.log")).unwrap();
/// let offset = journal.append(b"KJNL...").unwrap();
/// journal.sync().unwrap();
/// assert_eq!(journal.read_at(offset, 4).unwrap(), b"KJNL");
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<JournalFile>,
}

impl FileBackend {
    /// Opens the journal at `path`, creating an empty one if absent.
    ///
    /// Existing bytes are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its length read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(JournalFile { file, len }),
        })
    }

    /// Like [`FileBackend::open`], creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or the file
    /// cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Location of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.len;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        let mut buffer = vec![0u8; len];
        if len > 0 {
            inner.file.seek(SeekFrom::Start(offset))?;
            inner.file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let inner = self.inner.get_mut();
        let offset = inner.len;
        if !data.is_empty() {
            inner.file.seek(SeekFrom::Start(offset))?;
            inner.file.write_all(data)?;
            inner.len += data.len() as u64;
        }
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        if new_size > inner.len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: inner.len,
            });
        }
        inner.file.set_len(new_size)?;
        inner.file.sync_all()?;
        inner.len = new_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame(tag: u8, payload_len: usize) -> Vec<u8> {
        let mut frame = b"KJNL".to_vec();
        frame.push(tag);
        frame.resize(5 + payload_len, tag);
        frame
    }

    fn journal_in(dir: &TempDir) -> FileBackend {
        FileBackend::open(&dir.path().join("journal.log")).unwrap()
    }

    #[test]
    fn frames_land_back_to_back() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        let (first, second) = (frame(1, 40), frame(2, 300));

        assert_eq!(journal.append(&first).unwrap(), 0);
        let offset = journal.append(&second).unwrap();
        assert_eq!(offset, first.len() as u64);
        assert_eq!(journal.read_at(offset, second.len()).unwrap(), second);
        assert_eq!(journal.size().unwrap(), (first.len() + second.len()) as u64);
        assert_eq!(journal.append(&[]).unwrap(), journal.size().unwrap());
    }

    #[test]
    fn reads_past_the_last_frame_fail() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        journal.append(&frame(1, 10)).unwrap();
        assert!(matches!(
            journal.read_at(10, 16),
            Err(StorageError::ReadPastEnd { size: 15, .. })
        ));
        assert!(journal.read_at(15, 0).unwrap().is_empty());
    }

    #[test]
    fn synced_frames_are_there_after_reopen() {
        let dir = TempDir::new().unwrap();
        let frames = [frame(1, 64), frame(2, 8)];
        {
            let mut journal = journal_in(&dir);
            for frame in &frames {
                journal.append(frame).unwrap();
            }
            journal.sync().unwrap();
        }

        let mut journal = journal_in(&dir);
        assert_eq!(journal.read_all().unwrap(), frames.concat());
        let next = journal.append(&frame(3, 1)).unwrap();
        assert_eq!(next, frames.concat().len() as u64);
    }

    #[test]
    fn cutting_a_partial_frame_off_the_end() {
        let dir = TempDir::new().unwrap();
        let mut journal = journal_in(&dir);
        let whole = frame(1, 20);
        journal.append(&whole).unwrap();
        journal.append(&frame(2, 20)[..9]).unwrap();

        journal.truncate(whole.len() as u64).unwrap();
        assert_eq!(journal.read_all().unwrap(), whole);
        let on_disk = std::fs::metadata(journal.path()).unwrap().len();
        assert_eq!(on_disk, whole.len() as u64);
        assert!(matches!(
            journal.truncate(on_disk + 1),
            Err(StorageError::TruncatePastEnd { .. })
        ));
    }

    #[test]
    fn database_directory_is_created_on_demand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calendars").join("team.kairos").join("journal.log");
        let journal = FileBackend::open_with_create_dirs(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert_eq!(journal.size().unwrap(), 0);
        assert_eq!(journal.path(), path);
    }
}
