//! Users.

use crate::error::{CoreError, CoreResult};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user known to the store. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Row id.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
}

impl NewUser {
    /// Creates the input.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }

    /// Rejects empty or overlong values and emails without an `@`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the offending field.
    pub fn validate(&self, max_len: usize) -> CoreResult<()> {
        for (field, value) in [("username", &self.username), ("email", &self.email)] {
            if value.trim().is_empty() {
                return Err(CoreError::validation(field, "must not be empty"));
            }
            if value.chars().count() > max_len {
                return Err(CoreError::validation(
                    field,
                    format!("must be at most {max_len} characters"),
                ));
            }
        }
        if !self.email.contains('@') {
            return Err(CoreError::validation("email", "must contain '@'"));
        }
        Ok(())
    }
}

/// The public face of a user, embedded in changelog and sharing payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}
