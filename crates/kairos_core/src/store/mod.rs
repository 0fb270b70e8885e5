//! Transactional row store.
//!
//! Committed state is an arena of integer-keyed tables held in memory and
//! made durable by the [journal](crate::journal). Rows refer to each other
//! through explicit id fields; nothing is resolved implicitly.
//!
//! ## Concurrency
//!
//! Transactions are optimistic. Any number may be open at once; each
//! buffers its writes and reads committed state underneath them. Commits
//! are serialized by a single lock, under which each write set is checked
//! against everything committed before:
//!
//! - unique keys are not held by another row;
//! - rows the transaction overwrites are still committed;
//! - ids a written row points at resolve once the write set applies;
//! - no committed row is left pointing at a row the write set deletes.
//!
//! A transaction that fails a check at commit leaves no trace. Losing a
//! race for a version number or for a row is retryable.

mod tables;
mod transaction;

pub use transaction::Transaction;

pub(crate) use tables::Tables;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::journal::{CommitRecord, Journal, JournalWrite};
use crate::model::{Changelog, Event, EventPermission, EventVersion, User};
use crate::types::{
    ChangelogId, EventId, PermissionId, SequenceNumber, TransactionId, UserId, VersionId,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    /// [`User`] rows.
    Users,
    /// [`Event`] rows.
    Events,
    /// [`EventPermission`] rows.
    Permissions,
    /// [`EventVersion`] rows.
    Versions,
    /// [`Changelog`] rows.
    Changelogs,
}

impl Table {
    /// Number of tables.
    pub const COUNT: usize = 5;

    /// Every table.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Users,
        Self::Events,
        Self::Permissions,
        Self::Versions,
        Self::Changelogs,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Events => "events",
            Self::Permissions => "permissions",
            Self::Versions => "versions",
            Self::Changelogs => "changelogs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Table.
    pub table: Table,
    /// Row id within the table.
    pub id: u64,
}

impl RecordKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(table: Table, id: u64) -> Self {
        Self { table, id }
    }
}

/// A row of any table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// A user.
    User(User),
    /// An event.
    Event(Event),
    /// A permission grant.
    Permission(EventPermission),
    /// A stored version.
    Version(EventVersion),
    /// A changelog entry.
    Changelog(Changelog),
}

impl Record {
    /// The row's address.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        match self {
            Self::User(row) => RecordKey::new(Table::Users, row.id.as_u64()),
            Self::Event(row) => RecordKey::new(Table::Events, row.id.as_u64()),
            Self::Permission(row) => RecordKey::new(Table::Permissions, row.id.as_u64()),
            Self::Version(row) => RecordKey::new(Table::Versions, row.id.as_u64()),
            Self::Changelog(row) => RecordKey::new(Table::Changelogs, row.id.as_u64()),
        }
    }

    /// Unique keys the row claims.
    #[must_use]
    pub fn unique_keys(&self) -> Vec<UniqueKey> {
        match self {
            Self::User(user) => vec![
                UniqueKey::Username(user.username.clone()),
                UniqueKey::Email(user.email.clone()),
            ],
            Self::Permission(grant) => vec![UniqueKey::Grant(grant.event_id, grant.user_id)],
            Self::Version(version) => vec![UniqueKey::VersionNumber(
                version.event_id,
                version.version_number,
            )],
            Self::Event(_) | Self::Changelog(_) => Vec::new(),
        }
    }

    /// Rows this row points at through its id fields.
    #[must_use]
    pub fn references(&self) -> Vec<RecordKey> {
        let user = |id: UserId| RecordKey::new(Table::Users, id.as_u64());
        let event = |id: EventId| RecordKey::new(Table::Events, id.as_u64());
        match self {
            Self::User(_) => Vec::new(),
            Self::Event(row) => vec![user(row.owner_id)],
            Self::Permission(grant) => vec![event(grant.event_id), user(grant.user_id)],
            Self::Version(version) => std::iter::once(event(version.event_id))
                .chain(version.changed_by_user_id.map(user))
                .collect(),
            Self::Changelog(row) => std::iter::once(event(row.event_id))
                .chain(
                    row.version_id
                        .map(|id| RecordKey::new(Table::Versions, id.as_u64())),
                )
                .chain(row.user_id.map(user))
                .collect(),
        }
    }
}

/// A value that at most one row may hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    /// `(event_id, version_number)` on versions.
    VersionNumber(EventId, u32),
    /// `(event_id, user_id)` on permissions.
    Grant(EventId, UserId),
    /// `username` on users.
    Username(String),
    /// `email` on users.
    Email(String),
}

impl UniqueKey {
    /// The error reported when the key is already held.
    #[must_use]
    pub fn into_conflict(self) -> CoreError {
        match self {
            Self::VersionNumber(event_id, version_number) => CoreError::VersionConflict {
                event_id,
                version_number,
            },
            Self::Grant(event_id, user_id) => CoreError::PermissionExists { event_id, user_id },
            Self::Username(value) => CoreError::Duplicate {
                field: "username",
                value,
            },
            Self::Email(value) => CoreError::Duplicate {
                field: "email",
                value,
            },
        }
    }
}

/// A model type stored in one table.
pub trait Row: Clone + Sized {
    /// Id newtype of the table.
    type Id: Copy + From<u64> + Into<u64> + fmt::Display;

    /// The table holding rows of this type.
    const TABLE: Table;

    /// The row's id.
    fn row_id(&self) -> Self::Id;

    /// Wraps the row.
    fn into_record(self) -> Record;

    /// Borrows the row out of a record of its table.
    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! impl_row {
    ($row:ty, $id:ty, $table:ident, $variant:ident) => {
        impl Row for $row {
            type Id = $id;
            const TABLE: Table = Table::$table;

            fn row_id(&self) -> Self::Id {
                self.id
            }

            fn into_record(self) -> Record {
                Record::$variant(self)
            }

            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    Record::$variant(row) => Some(row),
                    _ => None,
                }
            }
        }
    };
}

impl_row!(User, UserId, Users, User);
impl_row!(Event, EventId, Events, Event);
impl_row!(EventPermission, PermissionId, Permissions, Permission);
impl_row!(EventVersion, VersionId, Versions, Version);
impl_row!(Changelog, ChangelogId, Changelogs, Changelog);

/// Shared state behind a [`crate::Database`].
pub(crate) struct Store {
    config: Config,
    journal: Journal,
    tables: RwLock<Tables>,
    commit_lock: Mutex<()>,
    sequences: [AtomicU64; Table::COUNT],
    next_txid: AtomicU64,
    committed_seq: AtomicU64,
}

impl Store {
    /// Rebuilds committed state from the journal.
    pub(crate) fn recover(config: Config, journal: Journal) -> CoreResult<Self> {
        let records = journal.replay()?;
        let mut tables = Tables::default();
        let mut last_txid = 0;
        let mut last_seq = 0;
        let replayed = records.len();
        for record in records {
            last_txid = last_txid.max(record.txid.as_u64());
            last_seq = last_seq.max(record.sequence.as_u64());
            tables.apply(record.writes);
        }

        let sequences = Table::ALL.map(|table| AtomicU64::new(tables.max_id(table) + 1));
        tracing::info!(
            commits = replayed,
            committed_seq = last_seq,
            events = tables.row_count(Table::Events),
            versions = tables.row_count(Table::Versions),
            "recovered journal"
        );

        Ok(Self {
            config,
            journal,
            tables: RwLock::new(tables),
            commit_lock: Mutex::new(()),
            sequences,
            next_txid: AtomicU64::new(last_txid + 1),
            committed_seq: AtomicU64::new(last_seq),
        })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn tables(&self) -> parking_lot::RwLockReadGuard<'_, Tables> {
        self.tables.read()
    }

    pub(crate) fn begin(&self) -> Transaction<'_> {
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        Transaction::new(self, id)
    }

    pub(crate) fn allocate_id(&self, table: Table) -> u64 {
        self.sequences[table.index()].fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    pub(crate) fn journal_size(&self) -> CoreResult<u64> {
        self.journal.size()
    }

    /// Validates, journals and applies one write set.
    ///
    /// `overwrites` are the written rows that were not inserted by the
    /// committing transaction. Nothing becomes visible unless the journal
    /// append succeeds.
    pub(crate) fn commit_writes(
        &self,
        txid: TransactionId,
        writes: Vec<JournalWrite>,
        overwrites: &[RecordKey],
    ) -> CoreResult<SequenceNumber> {
        if writes.is_empty() {
            return Ok(self.committed_seq());
        }

        let _guard = self.commit_lock.lock();
        {
            let tables = self.tables.read();
            tables.check_unique(writes.iter())?;
            tables.check_references(&writes, overwrites)?;
        }

        let sequence = self.committed_seq().next();
        let record = CommitRecord {
            txid,
            sequence,
            writes,
        };
        self.journal.append(&record)?;

        let write_count = record.writes.len();
        self.tables.write().apply(record.writes);
        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
        tracing::debug!(%txid, %sequence, writes = write_count, "committed");
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_storage::InMemoryBackend;

    #[test]
    fn unique_key_conflict_mapping() {
        assert!(UniqueKey::VersionNumber(EventId::new(1), 2)
            .into_conflict()
            .is_retryable());
        assert!(matches!(
            UniqueKey::Grant(EventId::new(1), UserId::new(2)).into_conflict(),
            CoreError::PermissionExists { .. }
        ));
        assert!(matches!(
            UniqueKey::Email("a@b".into()).into_conflict(),
            CoreError::Duplicate { field: "email", .. }
        ));
    }

    #[test]
    fn recovery_restores_sequences() {
        let backend = InMemoryBackend::new();
        {
            let journal = Journal::new(Box::new(backend.clone()), true);
            let store = Store::recover(Config::default(), journal).unwrap();
            let mut txn = store.begin();
            txn.insert(|id: UserId| User {
                id,
                username: "ada".into(),
                email: "ada@example.com".into(),
                created_at: chrono::Utc::now(),
            })
            .unwrap();
            txn.commit().unwrap();
        }

        let journal = Journal::new(Box::new(backend), true);
        let store = Store::recover(Config::default(), journal).unwrap();
        assert_eq!(store.committed_seq(), SequenceNumber::new(1));
        assert_eq!(store.allocate_id(Table::Users), 2);
        assert_eq!(store.allocate_id(Table::Events), 1);
        assert!(store.begin().id().as_u64() >= 2);
    }
}
