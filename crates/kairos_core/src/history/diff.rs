//! Diff engine.

use crate::error::CoreResult;
use crate::history::versions::get_version_for_event;
use crate::model::VersionDiff;
use crate::store::Transaction;
use crate::types::{EventId, VersionId};
use kairos_codec::full_delta;

/// Compares two stored versions of one event.
///
/// Covers the union of both field sets; a field missing on one side is
/// null there. Only differing fields are returned.
///
/// # Errors
///
/// Returns [`crate::CoreError::NotFound`] if either version is missing or
/// belongs to another event.
pub fn diff_versions(
    txn: &Transaction<'_>,
    event_id: EventId,
    left: VersionId,
    right: VersionId,
) -> CoreResult<VersionDiff> {
    let left_version = get_version_for_event(txn, event_id, left)?;
    let right_version = get_version_for_event(txn, event_id, right)?;
    Ok(VersionDiff {
        left,
        right,
        changes: full_delta(&left_version.data, &right_version.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::versions::append_version;
    use crate::testing::{seeded, standup};
    use chrono::Utc;
    use kairos_codec::{Snapshot, Value};
    use serde_json::json;

    #[test]
    fn union_of_fields_with_absent_as_null() {
        let (db, owner) = seeded();
        let event = standup(&db, owner);
        let mut txn = db.begin();
        let mut a = Snapshot::new();
        a.insert("title", "Standup");
        a.insert("location", "Room 1");
        let mut b = Snapshot::new();
        b.insert("title", "Standup");
        b.insert("description", "notes");
        let now = Utc::now();
        let va = append_version(&mut txn, event.id, 1, a, None, now).unwrap();
        let vb = append_version(&mut txn, event.id, 2, b, None, now).unwrap();

        let diff = diff_versions(&txn, event.id, va.id, vb.id).unwrap();
        assert_eq!(diff.fields().collect::<Vec<_>>(), vec!["description", "location"]);
        assert_eq!(diff.get("location").unwrap().new, Value::Null);
        assert_eq!(diff.get("description").unwrap().new, json!("notes"));

        assert!(diff_versions(&txn, event.id, va.id, va.id).unwrap().is_empty());
        assert_eq!(diff_versions(&txn, event.id, vb.id, va.id).unwrap(), diff.reversed());
    }

    #[test]
    fn foreign_version_is_not_found() {
        let (db, owner) = seeded();
        let a = standup(&db, owner);
        let b = standup(&db, owner);
        let mut txn = db.begin();
        let now = Utc::now();
        let va = append_version(&mut txn, a.id, 1, a.snapshot(), None, now).unwrap();
        let vb = append_version(&mut txn, b.id, 1, b.snapshot(), None, now).unwrap();
        assert!(diff_versions(&txn, a.id, va.id, vb.id).unwrap_err().is_not_found());
    }
}
