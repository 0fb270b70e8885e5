//! Roles and per-event permission grants.

use crate::error::{CoreError, CoreResult, Resource};
use crate::types::{EventId, PermissionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named role. What each role may do is decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control.
    Owner = 1,
    /// May edit.
    Editor = 2,
    /// Read only.
    Viewer = 3,
}

impl Role {
    /// Every role, by id.
    pub const ALL: [Self; 3] = [Self::Owner, Self::Editor, Self::Viewer];

    /// Stable numeric id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    /// Resolves a role by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown id.
    pub fn from_id(id: u8) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.id() == id)
            .ok_or_else(|| CoreError::not_found(Resource::Role, id))
    }

    /// Resolves a role by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown name.
    pub fn from_name(name: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| CoreError::not_found(Resource::Role, name))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Accepts a name or a numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u8>() {
            Ok(id) => Self::from_id(id),
            Err(_) => Self::from_name(s),
        }
    }
}

/// A user's role on one event. At most one per (event, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPermission {
    /// Row id.
    pub id: PermissionId,
    /// The shared event.
    pub event_id: EventId,
    /// The user it is shared with.
    pub user_id: UserId,
    /// Granted role.
    pub role: Role,
}

/// A permission joined with its user, as listed for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDetail {
    /// Permission row id.
    pub id: PermissionId,
    /// The event.
    pub event_id: EventId,
    /// The user.
    pub user_id: UserId,
    /// The user's name.
    pub username: String,
    /// The user's email.
    pub email: String,
    /// Role id.
    pub role_id: u8,
    /// Role name.
    pub role_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_resolve_by_id_and_name() {
        assert_eq!(Role::from_id(2).unwrap(), Role::Editor);
        assert_eq!(Role::from_name("Viewer").unwrap(), Role::Viewer);
        assert_eq!("1".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
    }

    #[test]
    fn unknown_role_is_not_found() {
        assert!(Role::from_id(9).unwrap_err().is_not_found());
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "role not found: admin");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
    }
}
