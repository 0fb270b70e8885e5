//! Committed table state.

use crate::error::{CoreError, CoreResult};
use crate::journal::JournalWrite;
use crate::store::{Record, RecordKey, Table, UniqueKey};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The five committed tables plus the unique-key index over them.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    rows: [BTreeMap<u64, Record>; Table::COUNT],
    unique: HashMap<UniqueKey, RecordKey>,
}

impl Tables {
    pub(crate) fn get(&self, key: RecordKey) -> Option<&Record> {
        self.rows[key.table.index()].get(&key.id)
    }

    pub(crate) fn table(&self, table: Table) -> &BTreeMap<u64, Record> {
        &self.rows[table.index()]
    }

    pub(crate) fn row_count(&self, table: Table) -> usize {
        self.rows[table.index()].len()
    }

    pub(crate) fn max_id(&self, table: Table) -> u64 {
        self.rows[table.index()]
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn unique_holder(&self, key: &UniqueKey) -> Option<RecordKey> {
        self.unique.get(key).copied()
    }

    /// Checks a write set against committed unique keys and against itself.
    ///
    /// A committed key is free if this write set deletes its holder or
    /// rewrites the holder without it.
    pub(crate) fn check_unique<'a>(
        &self,
        writes: impl Iterator<Item = &'a JournalWrite> + Clone,
    ) -> CoreResult<()> {
        let mut claimed: HashMap<UniqueKey, RecordKey> = HashMap::new();
        for write in writes.clone() {
            let JournalWrite::Put(record) = write else {
                continue;
            };
            for key in record.unique_keys() {
                if let Some(other) = claimed.insert(key.clone(), record.key()) {
                    if other != record.key() {
                        return Err(key.into_conflict());
                    }
                }
            }
        }

        for (key, owner) in &claimed {
            let Some(holder) = self.unique.get(key).copied() else {
                continue;
            };
            if holder == *owner {
                continue;
            }
            let released = writes.clone().any(|write| match write {
                JournalWrite::Delete(deleted) => *deleted == holder,
                JournalWrite::Put(record) => {
                    record.key() == holder && !record.unique_keys().contains(key)
                }
            });
            if !released {
                return Err(key.clone().into_conflict());
            }
        }
        Ok(())
    }

    /// Checks that a write set leaves every id field resolving to a row.
    ///
    /// Each key in `overwrites` must still be committed. Every written row
    /// must point only at rows that are committed or written here, and no
    /// committed row left untouched may point at a row deleted here.
    pub(crate) fn check_references(
        &self,
        writes: &[JournalWrite],
        overwrites: &[RecordKey],
    ) -> CoreResult<()> {
        if let Some(gone) = overwrites.iter().find(|key| self.get(**key).is_none()) {
            return Err(CoreError::stale(gone.table.name(), gone.id));
        }

        let written: HashMap<RecordKey, &JournalWrite> =
            writes.iter().map(|write| (write.key(), write)).collect();
        let present = |key: RecordKey| match written.get(&key) {
            Some(JournalWrite::Put(_)) => true,
            Some(JournalWrite::Delete(_)) => false,
            None => self.get(key).is_some(),
        };
        for write in writes {
            let JournalWrite::Put(record) = write else {
                continue;
            };
            if let Some(missing) = record.references().into_iter().find(|key| !present(*key)) {
                return Err(CoreError::stale(missing.table.name(), missing.id));
            }
        }

        let deleted: HashSet<RecordKey> = writes
            .iter()
            .filter_map(|write| match write {
                JournalWrite::Delete(key) => Some(*key),
                JournalWrite::Put(_) => None,
            })
            .collect();
        // Nothing points at permissions or changelog rows.
        if !deleted
            .iter()
            .any(|key| matches!(key.table, Table::Users | Table::Events | Table::Versions))
        {
            return Ok(());
        }
        for record in self.rows.iter().flat_map(BTreeMap::values) {
            let key = record.key();
            if written.contains_key(&key) {
                continue;
            }
            if record.references().iter().any(|target| deleted.contains(target)) {
                return Err(CoreError::stale(key.table.name(), key.id));
            }
        }
        Ok(())
    }

    /// Applies a validated write set.
    ///
    /// Old index entries are dropped before new ones are added so a key can
    /// move between rows within one commit.
    pub(crate) fn apply(&mut self, writes: Vec<JournalWrite>) {
        for write in &writes {
            let key = write.key();
            if let Some(previous) = self.rows[key.table.index()].get(&key.id) {
                for unique in previous.unique_keys() {
                    if self.unique.get(&unique) == Some(&key) {
                        self.unique.remove(&unique);
                    }
                }
            }
        }

        for write in writes {
            match write {
                JournalWrite::Put(record) => {
                    let key = record.key();
                    for unique in record.unique_keys() {
                        self.unique.insert(unique, key);
                    }
                    self.rows[key.table.index()].insert(key.id, record);
                }
                JournalWrite::Delete(key) => {
                    self.rows[key.table.index()].remove(&key.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::User;
    use crate::types::{EventId, UserId};
    use chrono::Utc;

    fn user(id: u64, name: &str) -> Record {
        Record::User(User {
            id: UserId::new(id),
            username: name.into(),
            email: format!("{name}@example.com"),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn apply_indexes_unique_keys() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        assert_eq!(tables.row_count(Table::Users), 1);
        assert_eq!(
            tables.unique_holder(&UniqueKey::Username("ada".into())),
            Some(RecordKey::new(Table::Users, 1))
        );
    }

    #[test]
    fn duplicate_against_committed_row() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        let writes = [JournalWrite::Put(user(2, "ada"))];
        let err = tables.check_unique(writes.iter()).unwrap_err();
        assert!(matches!(err, CoreError::Duplicate { field: "username", .. }));
    }

    #[test]
    fn duplicate_within_one_write_set() {
        let tables = Tables::default();
        let writes = [
            JournalWrite::Put(user(1, "ada")),
            JournalWrite::Put(user(2, "ada")),
        ];
        assert!(tables.check_unique(writes.iter()).is_err());
    }

    #[test]
    fn key_freed_by_delete_in_same_commit() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        let writes = vec![
            JournalWrite::Put(user(2, "ada")),
            JournalWrite::Delete(RecordKey::new(Table::Users, 1)),
        ];
        tables.check_unique(writes.iter()).unwrap();
        tables.apply(writes);
        assert_eq!(
            tables.unique_holder(&UniqueKey::Username("ada".into())),
            Some(RecordKey::new(Table::Users, 2))
        );
        assert_eq!(tables.max_id(Table::Users), 2);
    }

    fn event(id: u64, owner: u64) -> Record {
        Record::Event(crate::testing::standup_row(
            EventId::new(id),
            UserId::new(owner),
        ))
    }

    #[test]
    fn written_rows_must_point_at_live_rows() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        tables
            .check_references(&[JournalWrite::Put(event(1, 1))], &[])
            .unwrap();
        let err = tables
            .check_references(&[JournalWrite::Put(event(1, 2))], &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::Stale { table: "users", id: 2 }));

        let same_commit = [JournalWrite::Put(user(2, "bob")), JournalWrite::Put(event(1, 2))];
        tables.check_references(&same_commit, &[]).unwrap();
    }

    #[test]
    fn overwritten_rows_must_still_be_committed() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        let events = RecordKey::new(Table::Events, 1);
        let err = tables
            .check_references(&[JournalWrite::Put(event(1, 1))], &[events])
            .unwrap_err();
        assert!(err.is_retryable());

        tables.apply(vec![JournalWrite::Put(event(1, 1))]);
        tables
            .check_references(&[JournalWrite::Put(event(1, 1))], &[events])
            .unwrap();
    }

    #[test]
    fn deletes_may_not_leave_dangling_rows() {
        let mut tables = Tables::default();
        tables.apply(vec![
            JournalWrite::Put(user(1, "ada")),
            JournalWrite::Put(event(1, 1)),
        ]);
        let ada = RecordKey::new(Table::Users, 1);
        let err = tables
            .check_references(&[JournalWrite::Delete(ada)], &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::Stale { table: "events", id: 1 }));

        let cascade = [
            JournalWrite::Delete(RecordKey::new(Table::Events, 1)),
            JournalWrite::Delete(ada),
        ];
        tables.check_references(&cascade, &[]).unwrap();
    }

    #[test]
    fn rewriting_a_row_keeps_its_own_keys() {
        let mut tables = Tables::default();
        tables.apply(vec![JournalWrite::Put(user(1, "ada"))]);
        let writes = [JournalWrite::Put(user(1, "ada"))];
        tables.check_unique(writes.iter()).unwrap();
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn users(names: &[String]) -> Vec<JournalWrite> {
            names
                .iter()
                .zip(1..)
                .map(|(name, id)| JournalWrite::Put(user(id, name)))
                .collect()
        }

        proptest! {
            #[test]
            fn write_set_passes_iff_names_are_distinct(
                names in prop::collection::vec("[a-c]{1,2}", 1..8),
            ) {
                let distinct: HashSet<_> = names.iter().collect();
                let writes = users(&names);
                let tables = Tables::default();
                prop_assert_eq!(
                    tables.check_unique(writes.iter()).is_ok(),
                    distinct.len() == names.len()
                );
            }

            #[test]
            fn index_points_at_the_row_holding_each_key(
                names in prop::collection::hash_set("[a-z]{1,6}", 1..8),
                dropped in any::<prop::sample::Index>(),
            ) {
                let names: Vec<String> = names.into_iter().collect();
                let mut tables = Tables::default();
                let writes = users(&names);
                tables.check_unique(writes.iter()).unwrap();
                tables.apply(writes);

                let gone = dropped.index(names.len());
                let key = RecordKey::new(Table::Users, gone as u64 + 1);
                tables.apply(vec![JournalWrite::Delete(key)]);

                for (i, name) in names.iter().enumerate() {
                    let holder = tables.unique_holder(&UniqueKey::Username(name.clone()));
                    if i == gone {
                        prop_assert_eq!(holder, None);
                    } else {
                        prop_assert_eq!(holder, Some(RecordKey::new(Table::Users, i as u64 + 1)));
                    }
                }
            }
        }
    }
}
