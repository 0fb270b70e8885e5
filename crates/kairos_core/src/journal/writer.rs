//! Journal writer.

use crate::error::CoreResult;
use crate::journal::reader::FrameReader;
use crate::journal::record::CommitRecord;
use kairos_storage::StorageBackend;
use parking_lot::Mutex;

/// Append-only log of committed write sets.
pub struct Journal {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl Journal {
    /// Wraps a storage backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends one commit frame and returns its offset.
    ///
    /// The frame is flushed before returning when `sync_on_commit` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the backend rejects the write.
    pub fn append(&self, record: &CommitRecord) -> CoreResult<u64> {
        let frame = record.encode_frame()?;
        let mut backend = self.backend.lock();
        let offset = backend.append(&frame)?;
        if self.sync_on_commit {
            backend.flush()?;
        }
        Ok(offset)
    }

    /// Flushes pending appends to durable storage.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Reads every complete commit record in order.
    ///
    /// A torn final frame is cut off so later appends start on a frame
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns a corruption or checksum error for damaged frames, which
    /// must keep the database from opening.
    pub fn replay(&self) -> CoreResult<Vec<CommitRecord>> {
        let mut backend = self.backend.lock();
        let image = backend.read_all()?;
        let mut reader = FrameReader::new(&image);
        let mut records = Vec::new();
        for item in reader.by_ref() {
            let (_, record) = item?;
            records.push(record);
        }

        if reader.torn_tail() {
            let valid = reader.valid_len();
            tracing::warn!(
                valid_bytes = valid,
                dropped_bytes = image.len() as u64 - valid,
                "journal ends in a torn record, truncating"
            );
            backend.truncate(valid)?;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::{SequenceNumber, TransactionId};
    use kairos_storage::InMemoryBackend;

    fn commit(seq: u64) -> CommitRecord {
        CommitRecord {
            txid: TransactionId::new(seq),
            sequence: SequenceNumber::new(seq),
            writes: Vec::new(),
        }
    }

    #[test]
    fn append_then_replay() {
        let backend = InMemoryBackend::new();
        let journal = Journal::new(Box::new(backend.clone()), true);
        assert_eq!(journal.append(&commit(1)).unwrap(), 0);
        journal.append(&commit(2)).unwrap();

        let reopened = Journal::new(Box::new(backend), true);
        let records = reopened.replay().unwrap();
        assert_eq!(records, vec![commit(1), commit(2)]);
    }

    #[test]
    fn replay_trims_torn_tail() {
        let backend = InMemoryBackend::new();
        let journal = Journal::new(Box::new(backend.clone()), true);
        journal.append(&commit(1)).unwrap();
        let good = journal.size().unwrap();

        let mut image = backend.data();
        let torn = commit(2).encode_frame().unwrap();
        image.extend_from_slice(&torn[..torn.len() / 2]);
        let damaged = InMemoryBackend::with_data(image);

        let journal = Journal::new(Box::new(damaged.clone()), true);
        assert_eq!(journal.replay().unwrap(), vec![commit(1)]);
        assert_eq!(damaged.data().len() as u64, good);
    }

    #[test]
    fn replay_refuses_checksum_damage() {
        let backend = InMemoryBackend::new();
        Journal::new(Box::new(backend.clone()), true)
            .append(&commit(1))
            .unwrap();
        let mut image = backend.data();
        let last = image.len() - 1;
        image[last] ^= 0x01;

        let journal = Journal::new(Box::new(InMemoryBackend::with_data(image)), true);
        assert!(matches!(
            journal.replay(),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejected_append_surfaces_storage_error() {
        let backend = InMemoryBackend::new();
        backend.reject_appends(true);
        let journal = Journal::new(Box::new(backend), true);
        assert!(matches!(
            journal.append(&commit(1)),
            Err(CoreError::Storage(_))
        ));
    }
}
