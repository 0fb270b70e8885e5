//! Commit journal for durability and recovery.
//!
//! Every committed transaction is written as a single frame before any of
//! its rows become visible. On open the frames are replayed in order to
//! rebuild the tables.
//!
//! ## Frame format
//!
//! ```text
//! | magic "KJNL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little endian. The payload is the CBOR encoding of a
//! [`CommitRecord`] and the checksum covers every byte before it.
//!
//! ## Recovery policy
//!
//! - A frame cut short at the end of the journal (a crash mid-append) is
//!   dropped and the journal is truncated to the last complete frame.
//! - A checksum mismatch, bad magic, unknown type or future version is
//!   fatal: the database refuses to open.

mod reader;
mod record;
mod writer;

pub use reader::FrameReader;
pub use record::{
    compute_crc32, CommitRecord, JournalWrite, RecordType, JOURNAL_MAGIC, JOURNAL_VERSION,
};
pub use writer::Journal;
