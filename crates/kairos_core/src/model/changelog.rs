//! Changelog rows.

use crate::model::UserSummary;
use crate::types::{ChangelogId, EventId, UserId, VersionId};
use chrono::{DateTime, Utc};
use kairos_codec::ChangeSet;
use serde::{Deserialize, Serialize};

/// A recorded set of field changes, attributed to a version and a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changelog {
    /// Row id.
    pub id: ChangelogId,
    /// The event that changed.
    pub event_id: EventId,
    /// The version the change was recorded against.
    pub version_id: Option<VersionId>,
    /// Who made the change; cleared if that user is deleted.
    pub user_id: Option<UserId>,
    /// When the change was recorded.
    pub timestamp: DateTime<Utc>,
    /// Field name to old and new value. Never empty.
    pub changes: ChangeSet,
}

/// A changelog row with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// The row.
    #[serde(flatten)]
    pub changelog: Changelog,
    /// The author, if still present.
    pub user_details: Option<UserSummary>,
}
