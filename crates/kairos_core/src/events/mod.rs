//! Event mutation engine.
//!
//! Every state-changing operation on an existing event writes a version
//! and, when a field actually changed, a changelog row, all inside the
//! caller's transaction so they commit together with the mutation.
//!
//! - `update_event` versions the state *before* the update.
//! - `rollback_to_version` versions the state *after* the rollback.
//!
//! Creating events writes no history.

mod restore;

pub use restore::{restorable_update, SkippedField};

use crate::access::permissions::has_access;
use crate::error::{CoreError, CoreResult, Resource};
use crate::history::{
    append_version, diff_and_record, get_version_for_event, next_version_number, record_changes,
};
use crate::model::{Changelog, Event, EventPermission, EventUpdate, EventVersion, NewEvent, User};
use crate::store::Transaction;
use crate::types::{EventId, UserId, VersionId};
use chrono::Utc;
use kairos_codec::full_delta;
use std::collections::BTreeSet;

/// Looks an event up by id.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist.
pub fn get_event(txn: &Transaction<'_>, event_id: EventId) -> CoreResult<Event> {
    txn.get::<Event>(event_id)
        .ok_or_else(|| CoreError::not_found(Resource::Event, event_id))
}

/// Looks an event up on behalf of a user.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist or the user
/// neither owns it nor holds a grant on it.
pub fn get_event_with_permission(
    txn: &Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
) -> CoreResult<Event> {
    if !has_access(txn, event_id, user_id) {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    get_event(txn, event_id)
}

/// Events the user owns or has been granted, ordered by id.
#[must_use]
pub fn list_accessible_events(txn: &Transaction<'_>, user_id: UserId) -> Vec<Event> {
    let shared: BTreeSet<EventId> = txn
        .scan::<EventPermission>(|grant| grant.user_id == user_id)
        .into_iter()
        .map(|grant| grant.event_id)
        .collect();
    txn.scan::<Event>(|event| event.owner_id == user_id || shared.contains(&event.id))
}

/// Creates one event owned by `owner_id`. No version is written.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for bad input and
/// [`CoreError::NotFound`] if the owner does not exist.
pub fn create_event(
    txn: &mut Transaction<'_>,
    new: NewEvent,
    owner_id: UserId,
) -> CoreResult<Event> {
    new.validate(txn.config().max_text_len)?;
    if !txn.exists::<User>(owner_id) {
        return Err(CoreError::not_found(Resource::User, owner_id));
    }
    let now = Utc::now();
    txn.insert(|id| new.into_event(id, owner_id, now))
}

/// Creates several events at once.
///
/// Every row is validated before any is inserted; one bad row rejects the
/// whole batch. The error names the row by position, as in
/// `events[2].title`.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for the first bad row and
/// [`CoreError::NotFound`] if the owner does not exist.
pub fn create_events_batch(
    txn: &mut Transaction<'_>,
    events: Vec<NewEvent>,
    owner_id: UserId,
) -> CoreResult<Vec<Event>> {
    let max_len = txn.config().max_text_len;
    for (index, new) in events.iter().enumerate() {
        new.validate(max_len).map_err(|err| match err {
            CoreError::Validation { field, message } => {
                CoreError::validation(format!("events[{index}].{field}"), message)
            }
            other => other,
        })?;
    }
    if !txn.exists::<User>(owner_id) {
        return Err(CoreError::not_found(Resource::User, owner_id));
    }

    let now = Utc::now();
    let created = events
        .into_iter()
        .map(|new| txn.insert(|id| new.into_event(id, owner_id, now)))
        .collect::<CoreResult<Vec<_>>>()?;
    tracing::debug!(count = created.len(), %owner_id, "created event batch");
    Ok(created)
}

/// Applies a partial update.
///
/// The pre-update state is stored as the next version. The supplied fields
/// that differ from the current values are recorded as one changelog row
/// against that version. `updated_at` is stamped even when nothing differs.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist,
/// [`CoreError::Validation`] for bad input, and
/// [`CoreError::VersionConflict`] if the version number is taken.
pub fn update_event(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
    update: &EventUpdate,
) -> CoreResult<Event> {
    update.validate(txn.config().max_text_len)?;
    let mut event = get_event(txn, event_id)?;
    let now = Utc::now();

    let before = event.snapshot();
    let number = next_version_number(txn, event_id)?;
    let version = append_version(txn, event_id, number, before.clone(), Some(user_id), now)?;
    let changelog = diff_and_record(
        txn,
        event_id,
        Some(version.id),
        Some(user_id),
        &before,
        &update.to_partial_snapshot(),
        now,
    )?;

    update.apply_to(&mut event);
    event.updated_at = now;
    txn.put(event.clone())?;

    tracing::debug!(
        %event_id,
        version = number,
        changed = changelog.as_ref().map_or(0, |row| row.changes.len()),
        "updated event"
    );
    Ok(event)
}

/// Restores the restorable fields of a stored version.
///
/// The restored state is stored as the next version and the full
/// difference from the previous state is recorded against it. Stored values
/// that cannot be converted back are skipped with a warning.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event is missing or the version
/// is missing or belongs to another event, and
/// [`CoreError::VersionConflict`] if the version number is taken.
pub fn rollback_to_version(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    version_id: VersionId,
    user_id: UserId,
) -> CoreResult<Event> {
    let mut event = get_event(txn, event_id)?;
    let target = get_version_for_event(txn, event_id, version_id)?;
    let now = Utc::now();

    let before = event.snapshot();
    let (restore, skipped) = restorable_update(&target.data);
    for skip in &skipped {
        tracing::warn!(
            %event_id,
            %version_id,
            field = skip.field.name(),
            reason = %skip.reason,
            "stored value not restored"
        );
    }
    restore.apply_to(&mut event);
    event.updated_at = now;
    let after = event.snapshot();

    let number = next_version_number(txn, event_id)?;
    let version = append_version(txn, event_id, number, after.clone(), Some(user_id), now)?;
    record_changes(
        txn,
        event_id,
        Some(version.id),
        Some(user_id),
        full_delta(&before, &after),
        now,
    )?;
    txn.put(event.clone())?;

    tracing::debug!(
        %event_id,
        restored_from = target.version_number,
        version = number,
        "rolled back event"
    );
    Ok(event)
}

/// Deletes an event and its history.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist or
/// `user_id` is not its owner.
pub fn delete_event(txn: &mut Transaction<'_>, event_id: EventId, user_id: UserId) -> CoreResult<()> {
    let event = get_event(txn, event_id)?;
    if event.owner_id != user_id {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    purge_event(txn, event_id)
}

/// Removes an event with its grants, versions and changelog rows.
pub(crate) fn purge_event(txn: &mut Transaction<'_>, event_id: EventId) -> CoreResult<()> {
    for grant in txn.scan::<EventPermission>(|grant| grant.event_id == event_id) {
        txn.delete::<EventPermission>(grant.id)?;
    }
    for version in txn.scan::<EventVersion>(|version| version.event_id == event_id) {
        txn.delete::<EventVersion>(version.id)?;
    }
    for row in txn.scan::<Changelog>(|row| row.event_id == event_id) {
        txn.delete::<Changelog>(row.id)?;
    }
    txn.delete::<Event>(event_id)
}
