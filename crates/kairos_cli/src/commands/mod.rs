//! CLI command implementations.

pub mod event;
pub mod history;
pub mod inspect;
pub mod share;
pub mod user;

use clap::ValueEnum;
use kairos_core::{CoreError, Database, UserId};
use serde::Serialize;
use std::path::Path;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Errors surfaced by commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A database operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A timestamp argument did not parse.
    #[error(transparent)]
    Codec(#[from] kairos_codec::CodecError),

    /// JSON input or output failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The command needs `--user`.
    #[error("acting user required (--user)")]
    MissingUser,

    /// A flag combination makes no sense.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result alias for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Shared state for one invocation.
pub struct Context {
    /// The open database.
    pub db: Database,
    user: Option<UserId>,
    format: OutputFormat,
}

impl Context {
    /// Opens the database at `path`.
    pub fn open(path: &Path, user: Option<u64>, format: OutputFormat) -> CliResult<Self> {
        Ok(Self {
            db: Database::open(path)?,
            user: user.map(UserId::new),
            format,
        })
    }

    /// The `--user` id, required by commands that act on someone's behalf.
    pub fn acting_user(&self) -> CliResult<UserId> {
        self.user.ok_or(CliError::MissingUser)
    }

    /// Prints `value` as JSON, or through `text` in text mode.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(value),
        }
        Ok(())
    }
}

/// Renders a nullable text field.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acting_user_is_required() {
        let temp = tempdir().unwrap();
        let ctx = Context::open(&temp.path().join("db"), None, OutputFormat::Json).unwrap();
        assert!(matches!(ctx.acting_user(), Err(CliError::MissingUser)));

        let ctx_path = temp.path().join("other");
        let ctx = Context::open(&ctx_path, Some(4), OutputFormat::Text).unwrap();
        assert_eq!(ctx.acting_user().unwrap(), UserId::new(4));
    }
}
