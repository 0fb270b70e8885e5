//! Error types for Kairos core.

use crate::types::{EventId, UserId};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The kinds of record a lookup can fail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A user.
    User,
    /// An event.
    Event,
    /// A permission grant, keyed by event and user.
    Permission,
    /// A stored event version.
    Version,
    /// A named role.
    Role,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Event => "event",
            Self::Permission => "permission",
            Self::Version => "version",
            Self::Role => "role",
        })
    }
}

/// Errors that can occur in Kairos core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] kairos_storage::StorageError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] kairos_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal is corrupted or invalid.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch on a journal record.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// A referenced record does not exist, or does not belong to the
    /// record it was requested through.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        resource: Resource,
        /// The identifier as supplied by the caller.
        id: String,
    },

    /// Another writer committed the same version number for this event.
    ///
    /// Retryable: a fresh transaction derives the next number again.
    #[error("version {version_number} of {event_id} was written concurrently")]
    VersionConflict {
        /// The event whose numbering collided.
        event_id: EventId,
        /// The colliding version number.
        version_number: u32,
    },

    /// A row this commit overwrites or points at was changed by a
    /// transaction that committed first.
    ///
    /// Retryable: a fresh transaction reads the current rows.
    #[error("{table} row {id} was changed concurrently")]
    Stale {
        /// Table of the row.
        table: &'static str,
        /// Row id within the table.
        id: u64,
    },

    /// The user already holds a permission on the event.
    #[error("{user_id} already has a permission on {event_id}")]
    PermissionExists {
        /// The event.
        event_id: EventId,
        /// The user.
        user_id: UserId,
    },

    /// A unique value is already taken.
    #[error("{field} {value:?} is already taken")]
    Duplicate {
        /// Name of the unique field.
        field: &'static str,
        /// The duplicated value.
        value: String,
    },

    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Database is already open or locked.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// Invalid database directory or format.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Creates a stale-row error.
    pub fn stale(table: &'static str, id: u64) -> Self {
        Self::Stale { table, id }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for the not-found family.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for the conflict family.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. }
                | Self::Stale { .. }
                | Self::PermissionExists { .. }
                | Self::Duplicate { .. }
        )
    }

    /// Returns true if re-running the operation in a fresh transaction may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Stale { .. })
    }
}
