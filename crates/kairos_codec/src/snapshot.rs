//! Normalized field maps.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// A fully resolved copy of a record's field values at a point in time.
///
/// Keys are kept sorted, and producers are expected to have already rendered
/// datetimes through [`crate::format_timestamp`], so value equality between
/// two snapshots is the same as equality of their encoded bytes.
///
/// Serializes as a plain JSON object keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Returns the value of `field`, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the value of `field`, treating an absent field as `null`.
    #[must_use]
    pub fn get_or_null(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&NULL)
    }

    /// Returns true if `field` is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates over field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(field, value)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the snapshot has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only the fields accepted by `keep`.
    #[must_use]
    pub fn restricted_to(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Encodes the snapshot as compact JSON with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if serialization fails.
    pub fn to_json_bytes(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
