//! # Kairos Codec
//!
//! The snapshot codec shared by every mutation path of the Kairos event
//! store.
//!
//! This crate provides:
//! - [`Snapshot`]: a field-name → JSON value map with sorted keys, so two
//!   snapshots of equivalent data are always identical
//! - [`changed_fields`] / [`full_delta`]: field-level deltas between snapshots
//! - [`format_timestamp`] / [`parse_timestamp`]: the canonical ISO-8601 form
//!   every datetime takes inside a snapshot
//! - [`encode_cbor`] / [`decode_cbor`]: CBOR encoding of journal payloads
//!
//! ## Usage
//!
//! ```
//! use kairos_codec::{changed_fields, Snapshot};
//! use serde_json::json;
//!
//! let before = Snapshot::from_iter([("title".to_string(), json!("Standup"))]);
//! let after = Snapshot::from_iter([("title".to_string(), json!("Daily Standup"))]);
//!
//! let delta = changed_fields(&before, &after);
//! assert_eq!(delta["title"].old, json!("Standup"));
//! assert_eq!(delta["title"].new, json!("Daily Standup"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod delta;
mod error;
mod snapshot;
mod timestamp;

pub use cbor::{decode_cbor, encode_cbor};
pub use delta::{changed_fields, full_delta, ChangeSet, FieldChange};
pub use error::{CodecError, CodecResult};
pub use serde_json::Value;
pub use snapshot::Snapshot;
pub use timestamp::{format_timestamp, parse_timestamp};
