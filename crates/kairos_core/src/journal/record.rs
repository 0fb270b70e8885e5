//! Journal record types and framing.

use crate::error::{CoreError, CoreResult};
use crate::store::{Record, RecordKey};
use crate::types::{SequenceNumber, TransactionId};
use serde::{Deserialize, Serialize};

/// Magic bytes opening every journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"KJNL";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Type byte of a journal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A committed write set.
    Commit = 1,
}

impl RecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Commit),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One mutation inside a committed write set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalWrite {
    /// Insert or overwrite a row.
    Put(Record),
    /// Remove a row.
    Delete(RecordKey),
}

impl JournalWrite {
    /// The row this write touches.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Put(record) => record.key(),
            Self::Delete(key) => *key,
        }
    }
}

/// The durable form of one committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Transaction that produced the writes.
    pub txid: TransactionId,
    /// Commit order.
    pub sequence: SequenceNumber,
    /// Writes in key order.
    pub writes: Vec<JournalWrite>,
}

impl CommitRecord {
    /// Encodes the record into a complete frame, checksum included.
    ///
    /// # Errors
    ///
    /// Fails if the payload cannot be encoded or exceeds the 4 GiB length
    /// field.
    pub fn encode_frame(&self) -> CoreResult<Vec<u8>> {
        let payload = kairos_codec::encode_cbor(self)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("journal record payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        frame.push(RecordType::Commit.as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a commit payload (the bytes between header and checksum).
    pub fn decode_payload(payload: &[u8]) -> CoreResult<Self> {
        kairos_codec::decode_cbor(payload)
            .map_err(|e| CoreError::journal_corruption(format!("undecodable commit record: {e}")))
    }
}

const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 == 1 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// CRC-32 (IEEE) of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    !data.iter().fold(u32::MAX, |crc, &byte| {
        CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}
