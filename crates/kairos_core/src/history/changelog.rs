//! Changelog recorder.

use crate::error::{CoreError, CoreResult, Resource};
use crate::model::{Changelog, ChangelogEntry, Event, User, UserSummary};
use crate::store::Transaction;
use crate::types::{EventId, UserId, VersionId};
use chrono::{DateTime, Utc};
use kairos_codec::{changed_fields, ChangeSet, Snapshot};

/// Stores `changes` as one changelog row, or nothing if it is empty.
///
/// # Errors
///
/// Fails if the transaction is no longer active.
pub fn record_changes(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    version_id: Option<VersionId>,
    user_id: Option<UserId>,
    changes: ChangeSet,
    timestamp: DateTime<Utc>,
) -> CoreResult<Option<Changelog>> {
    if changes.is_empty() {
        return Ok(None);
    }
    txn.insert(|id| Changelog {
        id,
        event_id,
        version_id,
        user_id,
        timestamp,
        changes,
    })
    .map(Some)
}

/// Compares each field of `after_partial` with `before` and records the
/// ones that differ.
///
/// Fields missing from `before` compare as null.
///
/// # Errors
///
/// Fails if the transaction is no longer active.
pub fn diff_and_record(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    version_id: Option<VersionId>,
    user_id: Option<UserId>,
    before: &Snapshot,
    after_partial: &Snapshot,
    timestamp: DateTime<Utc>,
) -> CoreResult<Option<Changelog>> {
    let changes = changed_fields(before, after_partial);
    record_changes(txn, event_id, version_id, user_id, changes, timestamp)
}

/// The changelog of an event in chronological order, ties broken by
/// insertion order, each entry with its author's summary.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist.
pub fn get_changelog(txn: &Transaction<'_>, event_id: EventId) -> CoreResult<Vec<ChangelogEntry>> {
    if !txn.exists::<Event>(event_id) {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    let mut rows = txn.scan::<Changelog>(|row| row.event_id == event_id);
    rows.sort_by_key(|row| (row.timestamp, row.id));
    Ok(rows
        .into_iter()
        .map(|changelog| {
            let user_details = changelog
                .user_id
                .and_then(|id| txn.get::<User>(id))
                .map(|user| UserSummary::from(&user));
            ChangelogEntry {
                changelog,
                user_details,
            }
        })
        .collect())
}
