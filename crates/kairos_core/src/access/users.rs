//! User directory.

use crate::error::{CoreError, CoreResult, Resource};
use crate::events::purge_event;
use crate::model::{Changelog, Event, EventPermission, EventVersion, NewUser, User};
use crate::store::{Transaction, UniqueKey};
use crate::types::UserId;
use chrono::Utc;

/// Creates a user.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for empty or overlong values and
/// [`CoreError::Duplicate`] when the username or email is taken.
pub fn create_user(txn: &mut Transaction<'_>, new: NewUser) -> CoreResult<User> {
    new.validate(txn.config().max_text_len)?;
    txn.ensure_unique(UniqueKey::Username(new.username.clone()))?;
    txn.ensure_unique(UniqueKey::Email(new.email.clone()))?;
    let created_at = Utc::now();
    txn.insert(|id| User {
        id,
        username: new.username,
        email: new.email,
        created_at,
    })
}

/// Looks a user up by id.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the user does not exist.
pub fn get_user(txn: &Transaction<'_>, user_id: UserId) -> CoreResult<User> {
    txn.get::<User>(user_id)
        .ok_or_else(|| CoreError::not_found(Resource::User, user_id))
}

/// Looks a user up by exact username.
#[must_use]
pub fn find_user_by_username(txn: &Transaction<'_>, username: &str) -> Option<User> {
    let holder = txn.unique_holder(&UniqueKey::Username(username.to_string()))?;
    txn.get::<User>(UserId::new(holder.id))
}

/// Deletes a user.
///
/// Events the user owns are deleted with their history. The user's grants
/// are removed. Versions and changelog rows the user authored on other
/// events are kept with their author cleared.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the user does not exist.
pub fn delete_user(txn: &mut Transaction<'_>, user_id: UserId) -> CoreResult<()> {
    get_user(txn, user_id)?;

    for event in txn.scan::<Event>(|event| event.owner_id == user_id) {
        purge_event(txn, event.id)?;
    }
    for grant in txn.scan::<EventPermission>(|grant| grant.user_id == user_id) {
        txn.delete::<EventPermission>(grant.id)?;
    }
    for mut version in txn.scan::<EventVersion>(|v| v.changed_by_user_id == Some(user_id)) {
        version.changed_by_user_id = None;
        txn.put(version)?;
    }
    for mut row in txn.scan::<Changelog>(|row| row.user_id == Some(user_id)) {
        row.user_id = None;
        txn.put(row)?;
    }
    txn.delete::<User>(user_id)
}
