//! Permission directory: who may see an event, and in which role.

use crate::error::{CoreError, CoreResult, Resource};
use crate::model::{Event, EventPermission, PermissionDetail, Role, User};
use crate::store::{Transaction, UniqueKey};
use crate::types::{EventId, PermissionId, UserId};

fn missing_grant(event_id: EventId, user_id: UserId) -> CoreError {
    CoreError::not_found(Resource::Permission, format!("{event_id}/{user_id}"))
}

/// The grant for `(event_id, user_id)`, if any.
#[must_use]
pub fn find_permission(
    txn: &Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
) -> Option<EventPermission> {
    let holder = txn.unique_holder(&UniqueKey::Grant(event_id, user_id))?;
    txn.get::<EventPermission>(PermissionId::new(holder.id))
}

/// The grant for `(event_id, user_id)`.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] when no such grant exists.
pub fn get_permission(
    txn: &Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
) -> CoreResult<EventPermission> {
    find_permission(txn, event_id, user_id).ok_or_else(|| missing_grant(event_id, user_id))
}

/// Whether `user_id` owns the event or holds any grant on it.
///
/// A missing event grants access to nobody.
#[must_use]
pub fn has_access(txn: &Transaction<'_>, event_id: EventId, user_id: UserId) -> bool {
    match txn.get::<Event>(event_id) {
        Some(event) if event.owner_id == user_id => true,
        Some(_) => find_permission(txn, event_id, user_id).is_some(),
        None => false,
    }
}

/// Shares an event with a user.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event or user is missing, and
/// [`CoreError::PermissionExists`] if the user already holds a grant.
pub fn grant(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
    role: Role,
) -> CoreResult<EventPermission> {
    if !txn.exists::<Event>(event_id) {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    if !txn.exists::<User>(user_id) {
        return Err(CoreError::not_found(Resource::User, user_id));
    }
    txn.ensure_unique(UniqueKey::Grant(event_id, user_id))?;
    txn.insert(|id| EventPermission {
        id,
        event_id,
        user_id,
        role,
    })
}

/// Removes a user's grant.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] when no such grant exists.
pub fn revoke(txn: &mut Transaction<'_>, event_id: EventId, user_id: UserId) -> CoreResult<()> {
    let existing = get_permission(txn, event_id, user_id)?;
    txn.delete::<EventPermission>(existing.id)
}

/// Changes the role of an existing grant.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] when no such grant exists.
pub fn update_role(
    txn: &mut Transaction<'_>,
    event_id: EventId,
    user_id: UserId,
    role: Role,
) -> CoreResult<EventPermission> {
    let mut existing = get_permission(txn, event_id, user_id)?;
    existing.role = role;
    txn.put(existing.clone())?;
    Ok(existing)
}

/// Every grant on an event joined with its user, in grant order.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the event does not exist.
pub fn list_for_event(
    txn: &Transaction<'_>,
    event_id: EventId,
) -> CoreResult<Vec<PermissionDetail>> {
    if !txn.exists::<Event>(event_id) {
        return Err(CoreError::not_found(Resource::Event, event_id));
    }
    Ok(txn
        .scan::<EventPermission>(|grant| grant.event_id == event_id)
        .into_iter()
        .filter_map(|grant| {
            let user = txn.get::<User>(grant.user_id)?;
            Some(PermissionDetail {
                id: grant.id,
                event_id: grant.event_id,
                user_id: grant.user_id,
                username: user.username,
                email: user.email,
                role_id: grant.role.id(),
                role_name: grant.role.name().to_string(),
            })
        })
        .collect())
}
