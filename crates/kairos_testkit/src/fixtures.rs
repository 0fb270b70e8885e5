//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use kairos_core::Database;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// Database directory, for file-backed databases.
    path: Option<PathBuf>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory().expect("Failed to open in-memory database"),
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a new database in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.kairos");
        let db = Database::open(&path).expect("Failed to open file database");
        Self {
            db,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes and reopens a file-based database, replaying its journal.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases, whose contents do not outlive the
    /// handle.
    pub fn reopen(self) -> Self {
        let Self {
            db,
            path,
            _temp_dir,
        } = self;
        drop(db);
        let path = path.expect("Only file databases can be reopened");
        let db = Database::open(&path).expect("Failed to reopen file database");
        Self {
            db,
            path: Some(path),
            _temp_dir,
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust,ignore
/// use kairos_testkit::with_temp_db;
///
/// #[test]
/// fn my_test() {
///     with_temp_db(|db| {
///         let team = kairos_testkit::scenarios::team(db);
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db
        .path()
        .expect("File database should have a path")
        .to_path_buf();
    f(&test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use chrono::{DateTime, FixedOffset};
    use kairos_core::{Database, Event, EventId, EventUpdate, NewEvent, NewUser, User, UserId};

    /// Parses an RFC 3339 datetime.
    pub fn at(text: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(text).expect("Invalid test datetime")
    }

    /// Three users: one to own events and two to share them with.
    #[derive(Debug, Clone)]
    pub struct Team {
        /// Creates events.
        pub owner: User,
        /// Meant to receive the editor role.
        pub editor: User,
        /// Meant to receive the viewer role.
        pub viewer: User,
    }

    /// Registers `ada`, `bob` and `cy`.
    pub fn team(db: &Database) -> Team {
        let add = |name: &str| {
            db.create_user(NewUser::new(name, format!("{name}@example.com")))
                .expect("Failed to create user")
        };
        Team {
            owner: add("ada"),
            editor: add("bob"),
            viewer: add("cy"),
        }
    }

    /// The fifteen minute "Standup" on 2024-01-01 at 09:00 UTC.
    pub fn standup_event() -> NewEvent {
        NewEvent::new(
            "Standup",
            at("2024-01-01T09:00:00+00:00"),
            at("2024-01-01T09:15:00+00:00"),
        )
    }

    /// Creates [`standup_event`] owned by `owner`.
    pub fn standup(db: &Database, owner: UserId) -> Event {
        db.create_event(standup_event(), owner)
            .expect("Failed to create event")
    }

    /// Retitles an event once per entry, returning the event after each edit.
    pub fn retitle(db: &Database, event: EventId, user: UserId, titles: &[&str]) -> Vec<Event> {
        titles
            .iter()
            .map(|title| {
                db.update_event(event, user, &EventUpdate::new().title(*title))
                    .expect("Failed to update event")
            })
            .collect()
    }
}
