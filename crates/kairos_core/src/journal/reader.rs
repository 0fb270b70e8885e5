//! Sequential frame reader used by recovery.

use crate::error::{CoreError, CoreResult};
use crate::journal::record::{
    compute_crc32, CommitRecord, RecordType, CRC_SIZE, HEADER_SIZE, JOURNAL_MAGIC,
    JOURNAL_VERSION,
};

/// Walks the frames of a journal image in order.
///
/// A frame cut short by the end of the image ends iteration cleanly and
/// marks the reader as having seen a torn tail. Bad magic, an unknown type,
/// a future version or a checksum mismatch yield an error and end iteration.
pub struct FrameReader<'a> {
    data: &'a [u8],
    offset: usize,
    torn_tail: bool,
    finished: bool,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader over a complete journal image.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            torn_tail: false,
            finished: false,
        }
    }

    /// End offset of the last complete frame read so far.
    #[must_use]
    pub fn valid_len(&self) -> u64 {
        self.offset as u64
    }

    /// Whether iteration stopped at an incomplete frame.
    #[must_use]
    pub fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    fn fail(&mut self, err: CoreError) -> Option<CoreResult<(u64, CommitRecord)>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl Iterator for FrameReader<'_> {
    type Item = CoreResult<(u64, CommitRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let start = self.offset;
        let rest = &self.data[start..];
        if rest.is_empty() {
            self.finished = true;
            return None;
        }
        if rest.len() < HEADER_SIZE {
            self.torn_tail = true;
            self.finished = true;
            return None;
        }

        if rest[0..4] != JOURNAL_MAGIC {
            return self.fail(CoreError::journal_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > JOURNAL_VERSION {
            return self.fail(CoreError::journal_corruption(format!(
                "unsupported version {version} at offset {start}"
            )));
        }
        if RecordType::from_byte(rest[6]).is_none() {
            let type_byte = rest[6];
            return self.fail(CoreError::journal_corruption(format!(
                "unknown record type {type_byte} at offset {start}"
            )));
        }
        let payload_len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let frame_len = HEADER_SIZE + payload_len + CRC_SIZE;
        if rest.len() < frame_len {
            self.torn_tail = true;
            self.finished = true;
            return None;
        }

        let crc_at = HEADER_SIZE + payload_len;
        let expected = u32::from_le_bytes([
            rest[crc_at],
            rest[crc_at + 1],
            rest[crc_at + 2],
            rest[crc_at + 3],
        ]);
        let actual = compute_crc32(&rest[..crc_at]);
        if expected != actual {
            return self.fail(CoreError::ChecksumMismatch { expected, actual });
        }

        match CommitRecord::decode_payload(&rest[HEADER_SIZE..crc_at]) {
            Ok(record) => {
                self.offset = start + frame_len;
                Some(Ok((start as u64, record)))
            }
            Err(err) => self.fail(err),
        }
    }
}
