//! # Kairos Core
//!
//! Versioning, permission, rollback and diff engine for collaborative
//! calendar events.
//!
//! This crate provides:
//! - Events owned by users and shared with them through role grants
//! - A full snapshot of an event for every update and rollback
//! - A field-level changelog attributed to the acting user
//! - Rollback to any stored version and diffs between versions
//! - A commit journal for durability, replayed on open
//!
//! ## Example
//!
//! ```rust,ignore
//! use kairos_core::{Database, EventUpdate, NewEvent, NewUser, Role};
//!
//! let db = Database::open_in_memory()?;
//! let ada = db.create_user(NewUser::new("ada", "ada@example.com"))?;
//! let bob = db.create_user(NewUser::new("bob", "bob@example.com"))?;
//! let event = db.create_event(NewEvent::new("Standup", start, end), ada.id)?;
//! db.grant_permission(event.id, bob.id, Role::Editor)?;
//!
//! db.update_event(event.id, bob.id, &EventUpdate::new().title("Daily Standup"))?;
//! let first = &db.list_versions(event.id)?[0];
//! db.rollback_to_version(event.id, first.id, ada.id)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
mod config;
mod database;
#[cfg(feature = "std")]
mod dir;
mod error;
pub mod events;
pub mod history;
pub mod journal;
mod model;
mod store;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use config::Config;
pub use database::{Database, DatabaseStats};
#[cfg(feature = "std")]
pub use dir::DatabaseDir;
pub use error::{CoreError, CoreResult, Resource};
pub use model::{
    Changelog, ChangelogEntry, Event, EventField, EventPermission, EventUpdate, EventVersion,
    NewEvent, NewUser, PermissionDetail, Role, User, UserSummary, VersionDiff,
};
pub use store::{Record, RecordKey, Row, Table, Transaction, UniqueKey};
pub use types::{
    ChangelogId, EventId, PermissionId, SequenceNumber, TransactionId, UserId, VersionId,
};

pub use kairos_codec::{ChangeSet, FieldChange, Snapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
