//! Stored versions and diffs between them.

use crate::types::{EventId, UserId, VersionId};
use chrono::{DateTime, Utc};
use kairos_codec::{ChangeSet, FieldChange, Snapshot, Value};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// An immutable snapshot of an event, numbered 1, 2, ... per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventVersion {
    /// Row id.
    pub id: VersionId,
    /// The versioned event.
    pub event_id: EventId,
    /// Per-event number, unique with `event_id`.
    pub version_number: u32,
    /// Snapshot of the event's fields.
    pub data: Snapshot,
    /// Who caused the version; cleared if that user is deleted.
    pub changed_by_user_id: Option<UserId>,
    /// When the version was written.
    pub timestamp: DateTime<Utc>,
}

/// Fields that differ between two versions of one event.
///
/// For every entry, `old` is the value in `left` and `new` the value in
/// `right`.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDiff {
    /// First version compared.
    pub left: VersionId,
    /// Second version compared.
    pub right: VersionId,
    /// Differing fields.
    pub changes: ChangeSet,
}

impl VersionDiff {
    /// Whether the versions agree on every field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of differing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The change for one field, if it differs.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    /// Names of the differing fields, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// The same diff seen from the other side.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            changes: self
                .changes
                .iter()
                .map(|(field, change)| (field.clone(), change.clone().reversed()))
                .collect(),
        }
    }
}

struct SidePair<'a> {
    left_key: &'a str,
    left: &'a Value,
    right_key: &'a str,
    right: &'a Value,
}

impl Serialize for SidePair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.left_key, self.left)?;
        map.serialize_entry(self.right_key, self.right)?;
        map.end()
    }
}

/// Serializes as `{field: {"value_in_version_id_<left>": .., "value_in_version_id_<right>": ..}}`.
impl Serialize for VersionDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let left_key = format!("value_in_version_id_{}", self.left.as_u64());
        let right_key = format!("value_in_version_id_{}", self.right.as_u64());
        let mut map = serializer.serialize_map(Some(self.changes.len()))?;
        for (field, change) in &self.changes {
            map.serialize_entry(
                field,
                &SidePair {
                    left_key: &left_key,
                    left: &change.old,
                    right_key: &right_key,
                    right: &change.new,
                },
            )?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_payload_names_version_ids() {
        let mut changes = ChangeSet::new();
        changes.insert(
            "title".into(),
            FieldChange::new(json!("Standup"), json!("Daily Standup")),
        );
        let diff = VersionDiff {
            left: VersionId::new(4),
            right: VersionId::new(9),
            changes,
        };

        assert_eq!(
            serde_json::to_value(&diff).unwrap(),
            json!({
                "title": {
                    "value_in_version_id_4": "Standup",
                    "value_in_version_id_9": "Daily Standup"
                }
            })
        );
        assert_eq!(diff.fields().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn reversed_swaps_sides() {
        let mut changes = ChangeSet::new();
        changes.insert("location".into(), FieldChange::new(Value::Null, json!("Lab")));
        let diff = VersionDiff {
            left: VersionId::new(1),
            right: VersionId::new(2),
            changes,
        };
        let back = diff.reversed();
        assert_eq!(back.left, VersionId::new(2));
        assert_eq!(back.get("location").unwrap().old, json!("Lab"));
        assert_eq!(back.reversed(), diff);
    }

    #[test]
    fn empty_diff_serializes_to_empty_object() {
        let diff = VersionDiff {
            left: VersionId::new(3),
            right: VersionId::new(3),
            changes: ChangeSet::new(),
        };
        assert!(diff.is_empty());
        assert_eq!(serde_json::to_string(&diff).unwrap(), "{}");
    }
}
