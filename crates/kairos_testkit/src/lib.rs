//! # Kairos Testkit
//!
//! Test utilities for Kairos.
//!
//! This crate provides:
//! - Test databases, in memory or in a temporary directory
//! - Scenario builders for users, shared events and edit histories
//! - Property-based test generators using proptest
//! - Journal damage helpers for recovery tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kairos_testkit::prelude::*;
//!
//! #[test]
//! fn standup_history() {
//!     with_temp_db(|db| {
//!         let team = scenarios::team(db);
//!         let event = scenarios::standup(db, team.owner.id);
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
