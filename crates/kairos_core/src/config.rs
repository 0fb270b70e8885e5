//! Database configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the database already exists.
    pub error_if_exists: bool,

    /// Whether to flush the journal on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// How many times a write that lost a version-number race is re-run.
    pub conflict_retries: u32,

    /// Maximum length, in characters, of short text fields (title, location,
    /// username, email).
    pub max_text_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            sync_on_commit: true,
            conflict_retries: 1,
            max_text_len: 255,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if database exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to flush the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the number of retries after a version-number conflict.
    #[must_use]
    pub const fn conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Sets the maximum length of short text fields.
    #[must_use]
    pub const fn max_text_len(mut self, len: usize) -> Self {
        self.max_text_len = len;
        self
    }
}
