//! Version store: immutable, per-event numbered snapshots.

use crate::error::{CoreError, CoreResult, Resource};
use crate::model::{Event, EventVersion};
use crate::store::{Transaction, UniqueKey};
use crate::types::{EventId, UserId, VersionId};
use chrono::{DateTime, Utc};
use kairos_codec::Snapshot;

/// Number of versions stored for an event.
#[must_use]
pub fn count_versions(txn: &Transaction<'_>, event_id: EventId) -> usize {
    txn.count::<EventVersion>(|version| version.event_id == event_id)
}

/// The number the next version of `event_id` will take.
///
/// # Errors
///
/// Fails only if the count no longer fits in a `u32`.
pub fn next_version_number(txn: &Transaction<'_>, event_id: EventId) -> CoreResult<u32> {
    let count = count_versions(txn, event_id);
    u32::try_from(count + 1)
        .map_err(|_| CoreError::invalid_operation(format!("{event_id} has too many versions")))
}

/// Stores a new version.
///
/// # Errors
///
/// Returns [`CoreError::VersionConflict`] if `version_number` is already
/// taken for the event. The same error surfaces from commit when a
/// concurrent transaction took it first.
pub fn append_version(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    version_number: u32,
    data: Snapshot,
    changed_by: Option<UserId>,
    timestamp: DateTime<Utc>,
) -> CoreResult<EventVersion> {
    txn.ensure_unique(UniqueKey::VersionNumber(event_id, version_number))?;
    txn.insert(|id| EventVersion {
        id,
        event_id,
        version_number,
        data,
        changed_by_user_id: changed_by,
        timestamp,
    })
}

/// Looks a version up by id.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if no such version exists.
pub fn get_version(txn: &Transaction<'_>, version_id: VersionId) -> CoreResult<EventVersion> {
    txn.get::<EventVersion>(version_id)
        .ok_or_else(|| CoreError::not_found(Resource::Version, version_id))
}

/// Looks a version up by id, requiring it to belong to `event_id`.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the version is missing or belongs to
/// another event.
pub fn get_version_for_event(
    txn: &Transaction<'_>,
    event_id: EventId,
    version_id: VersionId,
) -> CoreResult<EventVersion> {
    match txn.get::<EventVersion>(version_id) {
        Some(version) if version.event_id == event_id => Ok(version),
        _ => Err(CoreError::not_found(Resource::Version, version_id)),
    }
}

/// All versions of an event, ordered by version number.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist.
pub fn list_versions(txn: &Transaction<'_>, event_id: EventId) -> CoreResult<Vec<EventVersion>> {
    if !txn.exists::<Event>(event_id) {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    let mut versions = txn.scan::<EventVersion>(|version| version.event_id == event_id);
    versions.sort_by_key(|version| version.version_number);
    Ok(versions)
}
