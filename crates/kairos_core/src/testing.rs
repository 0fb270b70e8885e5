//! Shared fixtures for unit tests.

use crate::database::Database;
use crate::model::{Event, NewEvent, NewUser};
use crate::types::{EventId, UserId};
use chrono::{DateTime, FixedOffset, Utc};

pub(crate) fn at(text: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(text).unwrap()
}

/// An in-memory database holding one committed user, `owner`.
pub(crate) fn seeded() -> (Database, UserId) {
    let db = Database::open_in_memory().unwrap();
    let owner = db
        .create_user(NewUser::new("owner", "owner@example.com"))
        .unwrap();
    (db, owner.id)
}

/// The "Standup" row itself, not stored anywhere.
pub(crate) fn standup_row(id: EventId, owner: UserId) -> Event {
    standup_event().into_event(id, owner, Utc::now())
}

fn standup_event() -> NewEvent {
    NewEvent::new(
        "Standup",
        at("2024-01-01T09:00:00+00:00"),
        at("2024-01-01T09:15:00+00:00"),
    )
}

/// A committed fifteen minute "Standup" owned by `owner`.
pub(crate) fn standup(db: &Database, owner: UserId) -> Event {
    db.create_event(standup_event(), owner).unwrap()
}
