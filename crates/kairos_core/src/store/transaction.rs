//! Transactions over the row store.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::journal::JournalWrite;
use crate::store::{Record, RecordKey, Row, Store, Table, UniqueKey};
use crate::types::{SequenceNumber, TransactionId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    Aborted,
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Put(Record),
    Delete,
}

/// A unit of work against the store.
///
/// Reads see the transaction's own writes first, then committed state.
/// Nothing is visible to other transactions until [`Transaction::commit`]
/// succeeds. Dropping an uncommitted transaction discards its writes.
pub struct Transaction<'db> {
    store: &'db Store,
    id: TransactionId,
    state: TxnState,
    writes: BTreeMap<RecordKey, PendingWrite>,
    inserted: BTreeSet<RecordKey>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(store: &'db Store, id: TransactionId) -> Self {
        Self {
            store,
            id,
            state: TxnState::Active,
            writes: BTreeMap::new(),
            inserted: BTreeSet::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns true if the transaction can still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    /// Number of buffered writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// The configuration of the owning database.
    #[must_use]
    pub fn config(&self) -> &Config {
        self.store.config()
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TxnState::Aborted => Err(CoreError::invalid_operation("transaction aborted")),
        }
    }

    /// Point lookup by id.
    #[must_use]
    pub fn get<R: Row>(&self, id: R::Id) -> Option<R> {
        let key = RecordKey::new(R::TABLE, id.into());
        match self.writes.get(&key) {
            Some(PendingWrite::Put(record)) => R::from_record(record).cloned(),
            Some(PendingWrite::Delete) => None,
            None => self
                .store
                .tables()
                .get(key)
                .and_then(R::from_record)
                .cloned(),
        }
    }

    /// Returns true if a row with this id is visible.
    #[must_use]
    pub fn exists<R: Row>(&self, id: R::Id) -> bool {
        self.get::<R>(id).is_some()
    }

    /// Every visible row of a table matching `filter`, in id order.
    pub fn scan<R: Row>(&self, mut filter: impl FnMut(&R) -> bool) -> Vec<R> {
        let mut rows: BTreeMap<u64, R> = self
            .store
            .tables()
            .table(R::TABLE)
            .iter()
            .filter_map(|(id, record)| R::from_record(record).map(|row| (*id, row)))
            .filter(|(_, row)| filter(row))
            .map(|(id, row)| (id, row.clone()))
            .collect();

        for (key, write) in self.writes_in(R::TABLE) {
            match write {
                PendingWrite::Put(record) => match R::from_record(record) {
                    Some(row) if filter(row) => {
                        rows.insert(key.id, row.clone());
                    }
                    _ => {
                        rows.remove(&key.id);
                    }
                },
                PendingWrite::Delete => {
                    rows.remove(&key.id);
                }
            }
        }
        rows.into_values().collect()
    }

    /// Number of visible rows of a table matching `filter`.
    pub fn count<R: Row>(&self, filter: impl FnMut(&R) -> bool) -> usize {
        self.scan(filter).len()
    }

    fn writes_in(&self, table: Table) -> impl Iterator<Item = (&RecordKey, &PendingWrite)> {
        self.writes
            .range(RecordKey::new(table, 0)..=RecordKey::new(table, u64::MAX))
    }

    /// The row currently holding a unique key, if any.
    #[must_use]
    pub fn unique_holder(&self, key: &UniqueKey) -> Option<RecordKey> {
        for (record_key, write) in &self.writes {
            if let PendingWrite::Put(record) = write {
                if record.unique_keys().contains(key) {
                    return Some(*record_key);
                }
            }
        }
        let holder = self.store.tables().unique_holder(key)?;
        match self.writes.get(&holder) {
            None => Some(holder),
            // Rewritten or deleted here; the scan above covers rows that
            // still hold the key.
            Some(_) => None,
        }
    }

    /// Fails with the key's conflict error if another row holds it.
    pub fn ensure_unique(&self, key: UniqueKey) -> CoreResult<()> {
        match self.unique_holder(&key) {
            Some(_) => Err(key.into_conflict()),
            None => Ok(()),
        }
    }

    /// Allocates an id and inserts the row `build` makes from it.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn insert<R: Row>(&mut self, build: impl FnOnce(R::Id) -> R) -> CoreResult<R> {
        self.ensure_active()?;
        let id = R::Id::from(self.store.allocate_id(R::TABLE));
        self.inserted.insert(RecordKey::new(R::TABLE, id.into()));
        let row = build(id);
        self.put(row.clone())?;
        Ok(row)
    }

    /// Overwrites a row.
    ///
    /// Rows not created by [`Transaction::insert`] must still be committed
    /// when this transaction commits.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn put<R: Row>(&mut self, row: R) -> CoreResult<()> {
        self.ensure_active()?;
        let key = RecordKey::new(R::TABLE, row.row_id().into());
        self.writes.insert(key, PendingWrite::Put(row.into_record()));
        Ok(())
    }

    /// Deletes a row. Deleting an absent row is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn delete<R: Row>(&mut self, id: R::Id) -> CoreResult<()> {
        self.ensure_active()?;
        let key = RecordKey::new(R::TABLE, id.into());
        let committed = self.store.tables().get(key).is_some();
        if committed {
            self.writes.insert(key, PendingWrite::Delete);
        } else {
            self.writes.remove(&key);
        }
        Ok(())
    }

    /// Commits the buffered writes atomically.
    ///
    /// On failure the transaction is aborted and committed state is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if a unique key was taken by a transaction
    /// that committed first, [`CoreError::Stale`] if such a transaction
    /// removed a row this one overwrites or points at, or a storage error
    /// if the journal append fails.
    pub fn commit(&mut self) -> CoreResult<SequenceNumber> {
        self.ensure_active()?;
        let inserted = std::mem::take(&mut self.inserted);
        let mut overwrites = Vec::new();
        let writes = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(key, write)| match write {
                PendingWrite::Put(record) => {
                    if !inserted.contains(&key) {
                        overwrites.push(key);
                    }
                    JournalWrite::Put(record)
                }
                PendingWrite::Delete => JournalWrite::Delete(key),
            })
            .collect();

        match self.store.commit_writes(self.id, writes, &overwrites) {
            Ok(sequence) => {
                self.state = TxnState::Committed;
                Ok(sequence)
            }
            Err(err) => {
                self.state = TxnState::Aborted;
                Err(err)
            }
        }
    }

    /// Discards the buffered writes.
    pub fn abort(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.writes.clear();
        self.inserted.clear();
        self.state = TxnState::Aborted;
        Ok(())
    }
}
