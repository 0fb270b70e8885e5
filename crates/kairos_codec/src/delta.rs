//! Field-level deltas between snapshots.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The old and new value of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value before the change.
    pub old: Value,
    /// Value after the change.
    pub new: Value,
}

impl FieldChange {
    /// Creates a change record.
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Returns the same change seen from the other side.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            old: self.new,
            new: self.old,
        }
    }
}

/// Changed fields keyed by field name.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Compares every field present in `after` against `before`.
///
/// Fields missing from `before` count as `null`. Fields only present in
/// `before` are ignored, which is what a partial update wants: fields the
/// caller did not supply are not part of the change.
#[must_use]
pub fn changed_fields(before: &Snapshot, after: &Snapshot) -> ChangeSet {
    after
        .iter()
        .filter_map(|(field, new)| {
            let old = before.get_or_null(field);
            (old != new).then(|| (field.to_string(), FieldChange::new(old.clone(), new.clone())))
        })
        .collect()
}

/// Compares the union of both field sets.
///
/// A field present on one side only is compared against `null`.
#[must_use]
pub fn full_delta(left: &Snapshot, right: &Snapshot) -> ChangeSet {
    let mut delta = changed_fields(left, right);
    for (field, old) in left.iter() {
        if !right.contains(field) && !old.is_null() {
            delta.insert(field.to_string(), FieldChange::new(old.clone(), Value::Null));
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn snapshot(pairs: &[(&str, Value)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn partial_delta_ignores_unsupplied_fields() {
        let before = snapshot(&[("title", json!("Standup")), ("location", json!("Room 1"))]);
        let after = snapshot(&[("title", json!("Daily Standup"))]);

        let delta = changed_fields(&before, &after);
        assert_eq!(delta.len(), 1);
        assert_eq!(
            delta["title"],
            FieldChange::new("Standup", "Daily Standup")
        );
    }

    #[test]
    fn equal_values_produce_no_delta() {
        let before = snapshot(&[("title", json!("Standup"))]);
        assert!(changed_fields(&before, &before.clone()).is_empty());
    }

    #[test]
    fn missing_side_is_null() {
        let left = snapshot(&[("title", json!("a")), ("legacy", json!(1))]);
        let right = snapshot(&[("title", json!("a")), ("added", json!(true))]);

        let delta = full_delta(&left, &right);
        assert_eq!(delta["legacy"], FieldChange::new(1, Value::Null));
        assert_eq!(delta["added"], FieldChange::new(Value::Null, true));
        assert!(!delta.contains_key("title"));
    }

    #[test]
    fn explicit_null_equals_absent() {
        let left = snapshot(&[("description", Value::Null)]);
        let right = Snapshot::new();
        assert!(full_delta(&left, &right).is_empty());
        assert!(full_delta(&right, &left).is_empty());
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        prop::collection::btree_map(
            "[a-d]",
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                (0i64..4).prop_map(Value::from),
                "[xy]{0,2}".prop_map(Value::from),
            ],
            0..4,
        )
        .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn full_delta_is_symmetric(a in arb_snapshot(), b in arb_snapshot()) {
            let forward = full_delta(&a, &b);
            let backward = full_delta(&b, &a);
            prop_assert_eq!(forward.len(), backward.len());
            for (field, change) in forward {
                prop_assert_eq!(Some(&change.reversed()), backward.get(&field));
            }
        }

        #[test]
        fn full_delta_with_self_is_empty(a in arb_snapshot()) {
            prop_assert!(full_delta(&a, &a).is_empty());
        }
    }
}
