//! Database facade.

use crate::access::{permissions, users};
use crate::config::Config;
#[cfg(feature = "std")]
use crate::dir::DatabaseDir;
use crate::error::{CoreError, CoreResult};
use crate::events;
use crate::history::{changelog, diff, versions};
use crate::journal::Journal;
use crate::model::{
    ChangelogEntry, Event, EventPermission, EventUpdate, EventVersion, NewEvent, NewUser,
    PermissionDetail, Role, User, VersionDiff,
};
use crate::store::{Store, Table, Transaction};
use crate::types::{EventId, SequenceNumber, UserId, VersionId};
use kairos_storage::{InMemoryBackend, StorageBackend};
use serde::Serialize;
#[cfg(feature = "std")]
use std::path::{Path, PathBuf};

/// Row counts and journal position of an open database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Users.
    pub users: usize,
    /// Events.
    pub events: usize,
    /// Permission grants.
    pub permissions: usize,
    /// Stored versions.
    pub versions: usize,
    /// Changelog rows.
    pub changelogs: usize,
    /// Sequence number of the last commit.
    pub committed_seq: u64,
    /// Journal size in bytes.
    pub journal_bytes: u64,
}

/// An open Kairos database.
///
/// Operations are available two ways: as free functions in
/// [`crate::events`], [`crate::history`] and [`crate::access`] that take an
/// explicit [`Transaction`], or as methods here that each run in their own
/// transaction.
///
/// # Example
///
/// ```rust,ignore
/// use kairos_core::{Database, EventUpdate, NewEvent, NewUser};
///
/// let db = Database::open_in_memory()?;
/// let owner = db.create_user(NewUser::new("ada", "ada@example.com"))?;
/// let event = db.create_event(NewEvent::new("Standup", start, end), owner.id)?;
/// db.update_event(event.id, owner.id, &EventUpdate::new().title("Daily Standup"))?;
/// assert_eq!(db.list_versions(event.id)?.len(), 1);
/// ```
pub struct Database {
    store: Store,
    #[cfg(feature = "std")]
    dir: Option<DatabaseDir>,
}

impl Database {
    /// Opens or creates a database in a directory with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DatabaseLocked`] if the directory is in use,
    /// a journal error if recovery fails, or an I/O error.
    #[cfg(feature = "std")]
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens or creates a database in a directory.
    ///
    /// # Errors
    ///
    /// As [`Database::open`], plus [`CoreError::InvalidFormat`] when
    /// `create_if_missing` or `error_if_exists` forbid opening.
    #[cfg(feature = "std")]
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        use kairos_storage::FileBackend;

        let dir = DatabaseDir::open(path, config.create_if_missing)?;
        if !config.create_if_missing && dir.is_new_database() {
            return Err(CoreError::invalid_format(
                "database does not exist and create_if_missing is false",
            ));
        }
        if config.error_if_exists && !dir.is_new_database() {
            return Err(CoreError::invalid_format(
                "database already exists and error_if_exists is true",
            ));
        }

        let backend = FileBackend::open_with_create_dirs(&dir.journal_path())?;
        let journal = Journal::new(Box::new(backend), config.sync_on_commit);
        let store = Store::recover(config, journal)?;
        tracing::info!(path = %path.display(), "opened database");
        Ok(Self {
            store,
            dir: Some(dir),
        })
    }

    /// Opens an empty database that lives only in memory.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a database over a caller-supplied journal backend, replaying
    /// whatever it already holds.
    ///
    /// # Errors
    ///
    /// Returns a journal error if recovery fails.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let journal = Journal::new(backend, config.sync_on_commit);
        Ok(Self {
            store: Store::recover(config, journal)?,
            #[cfg(feature = "std")]
            dir: None,
        })
    }

    /// The configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        self.store.config()
    }

    /// The directory, for file-backed databases.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }

    /// The journal file, for file-backed databases.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(DatabaseDir::journal_path)
    }

    /// Begins a transaction. It must be committed to take effect.
    #[must_use]
    pub fn begin(&self) -> Transaction<'_> {
        self.store.begin()
    }

    /// Runs `f` in a transaction, committing on `Ok` and aborting on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` or from commit.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if txn.is_active() {
                    txn.abort()?;
                }
                Err(err)
            }
        }
    }

    /// Like [`Database::transaction`], re-running `f` in a fresh
    /// transaction after a retryable conflict, up to
    /// [`Config::conflict_retries`] times.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or the first
    /// non-retryable error.
    pub fn transaction_with_retry<F, T>(&self, mut f: F) -> CoreResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut attempt = 0;
        loop {
            match self.transaction(&mut f) {
                Err(err) if err.is_retryable() && attempt < self.config().conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "retrying after conflict");
                }
                result => return result,
            }
        }
    }

    /// Sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.store.committed_seq()
    }

    /// Row counts and journal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal size cannot be read.
    pub fn stats(&self) -> CoreResult<DatabaseStats> {
        let journal_bytes = self.store.journal_size()?;
        let tables = self.store.tables();
        Ok(DatabaseStats {
            users: tables.row_count(Table::Users),
            events: tables.row_count(Table::Events),
            permissions: tables.row_count(Table::Permissions),
            versions: tables.row_count(Table::Versions),
            changelogs: tables.row_count(Table::Changelogs),
            committed_seq: self.committed_seq().as_u64(),
            journal_bytes,
        })
    }

    // Users

    /// Creates a user. See [`users::create_user`].
    pub fn create_user(&self, new: NewUser) -> CoreResult<User> {
        self.transaction(|txn| users::create_user(txn, new))
    }

    /// Looks a user up. See [`users::get_user`].
    pub fn get_user(&self, user_id: UserId) -> CoreResult<User> {
        users::get_user(&self.begin(), user_id)
    }

    /// Looks a user up by username.
    #[must_use]
    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        users::find_user_by_username(&self.begin(), username)
    }

    /// Deletes a user with cascades. See [`users::delete_user`].
    pub fn delete_user(&self, user_id: UserId) -> CoreResult<()> {
        self.transaction_with_retry(|txn| users::delete_user(txn, user_id))
    }

    // Events

    /// Creates an event. See [`events::create_event`].
    pub fn create_event(&self, new: NewEvent, owner_id: UserId) -> CoreResult<Event> {
        self.transaction_with_retry(|txn| events::create_event(txn, new.clone(), owner_id))
    }

    /// Creates events under one commit. See [`events::create_events_batch`].
    pub fn create_events_batch(
        &self,
        new: Vec<NewEvent>,
        owner_id: UserId,
    ) -> CoreResult<Vec<Event>> {
        self.transaction_with_retry(|txn| {
            events::create_events_batch(txn, new.clone(), owner_id)
        })
    }

    /// Looks an event up. See [`events::get_event`].
    pub fn get_event(&self, event_id: EventId) -> CoreResult<Event> {
        events::get_event(&self.begin(), event_id)
    }

    /// Looks an event up for a user. See [`events::get_event_with_permission`].
    pub fn get_event_with_permission(&self, event_id: EventId, user_id: UserId) -> CoreResult<Event> {
        events::get_event_with_permission(&self.begin(), event_id, user_id)
    }

    /// Events the user owns or has been granted.
    #[must_use]
    pub fn list_accessible_events(&self, user_id: UserId) -> Vec<Event> {
        events::list_accessible_events(&self.begin(), user_id)
    }

    /// Updates an event, retrying after a lost race.
    /// See [`events::update_event`].
    pub fn update_event(
        &self,
        event_id: EventId,
        user_id: UserId,
        update: &EventUpdate,
    ) -> CoreResult<Event> {
        self.transaction_with_retry(|txn| events::update_event(txn, event_id, user_id, update))
    }

    /// Rolls an event back, retrying after a lost race.
    /// See [`events::rollback_to_version`].
    pub fn rollback_to_version(
        &self,
        event_id: EventId,
        version_id: VersionId,
        user_id: UserId,
    ) -> CoreResult<Event> {
        self.transaction_with_retry(|txn| {
            events::rollback_to_version(txn, event_id, version_id, user_id)
        })
    }

    /// Deletes an event with its history. See [`events::delete_event`].
    pub fn delete_event(&self, event_id: EventId, user_id: UserId) -> CoreResult<()> {
        self.transaction_with_retry(|txn| events::delete_event(txn, event_id, user_id))
    }

    // Sharing

    /// Shares an event. See [`permissions::grant`].
    pub fn grant_permission(
        &self,
        event_id: EventId,
        user_id: UserId,
        role: Role,
    ) -> CoreResult<EventPermission> {
        self.transaction_with_retry(|txn| permissions::grant(txn, event_id, user_id, role))
    }

    /// Removes a grant. See [`permissions::revoke`].
    pub fn revoke_permission(&self, event_id: EventId, user_id: UserId) -> CoreResult<()> {
        self.transaction_with_retry(|txn| permissions::revoke(txn, event_id, user_id))
    }

    /// Changes a grant's role. See [`permissions::update_role`].
    pub fn update_permission(
        &self,
        event_id: EventId,
        user_id: UserId,
        role: Role,
    ) -> CoreResult<EventPermission> {
        self.transaction_with_retry(|txn| {
            permissions::update_role(txn, event_id, user_id, role)
        })
    }

    /// Grants on an event with user details.
    pub fn list_permissions(&self, event_id: EventId) -> CoreResult<Vec<PermissionDetail>> {
        permissions::list_for_event(&self.begin(), event_id)
    }

    /// Whether the user owns or has been granted the event.
    #[must_use]
    pub fn has_access(&self, event_id: EventId, user_id: UserId) -> bool {
        permissions::has_access(&self.begin(), event_id, user_id)
    }

    // History

    /// Versions of an event by number.
    pub fn list_versions(&self, event_id: EventId) -> CoreResult<Vec<EventVersion>> {
        versions::list_versions(&self.begin(), event_id)
    }

    /// One version of an event.
    pub fn get_version(&self, event_id: EventId, version_id: VersionId) -> CoreResult<EventVersion> {
        versions::get_version_for_event(&self.begin(), event_id, version_id)
    }

    /// Changelog of an event, oldest first.
    pub fn get_changelog(&self, event_id: EventId) -> CoreResult<Vec<ChangelogEntry>> {
        changelog::get_changelog(&self.begin(), event_id)
    }

    /// Differences between two versions of an event.
    pub fn get_diff(
        &self,
        event_id: EventId,
        left: VersionId,
        right: VersionId,
    ) -> CoreResult<VersionDiff> {
        diff::diff_versions(&self.begin(), event_id, left, right)
    }
}
