//! Row types stored in the tables and the payloads built from them.

mod changelog;
mod event;
mod permission;
mod user;
mod version;

pub use changelog::{Changelog, ChangelogEntry};
pub use event::{Event, EventField, EventUpdate, NewEvent};
pub use permission::{EventPermission, PermissionDetail, Role};
pub use user::{NewUser, User, UserSummary};
pub use version::{EventVersion, VersionDiff};

use serde::{Deserialize, Deserializer};

/// Deserializes a present field into `Some`, so a JSON `null` becomes
/// `Some(None)` while a missing key (via `#[serde(default)]`) stays `None`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
