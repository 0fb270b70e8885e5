//! Turning stored version data back into typed field values.

use crate::model::{EventField, EventUpdate};
use kairos_codec::{parse_timestamp, Snapshot, Value};

/// A restorable field that could not be converted and was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
    /// The field.
    pub field: EventField,
    /// Why it was skipped.
    pub reason: String,
}

fn skipped(field: EventField, reason: impl Into<String>) -> SkippedField {
    SkippedField {
        field,
        reason: reason.into(),
    }
}

fn nullable_text(field: EventField, value: &Value) -> Result<Option<String>, SkippedField> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        other => Err(skipped(field, format!("expected text or null, found {other}"))),
    }
}

/// Builds the update that puts the restorable fields of `data` back.
///
/// Fields absent from `data` are not touched. A field whose stored value
/// has the wrong shape, such as a datetime string that does not parse, is
/// reported in the second list and left out of the update.
#[must_use]
pub fn restorable_update(data: &Snapshot) -> (EventUpdate, Vec<SkippedField>) {
    let mut update = EventUpdate::new();
    let mut skipped_fields = Vec::new();

    for field in EventField::RESTORABLE {
        let Some(value) = data.get(field.name()) else {
            continue;
        };
        let applied = match field {
            EventField::Title => match value {
                Value::String(title) => {
                    update.title = Some(title.clone());
                    Ok(())
                }
                other => Err(skipped(field, format!("expected text, found {other}"))),
            },
            EventField::Description => nullable_text(field, value).map(|text| {
                update.description = Some(text);
            }),
            EventField::Location => nullable_text(field, value).map(|text| {
                update.location = Some(text);
            }),
            EventField::StartTime | EventField::EndTime => match value {
                Value::String(text) => match parse_timestamp(text) {
                    Ok(ts) if field == EventField::StartTime => {
                        update.start_time = Some(ts);
                        Ok(())
                    }
                    Ok(ts) => {
                        update.end_time = Some(ts);
                        Ok(())
                    }
                    Err(err) => Err(skipped(field, err.to_string())),
                },
                other => Err(skipped(field, format!("expected a datetime, found {other}"))),
            },
            EventField::IsRecurring => match value {
                Value::Bool(flag) => {
                    update.is_recurring = Some(*flag);
                    Ok(())
                }
                other => Err(skipped(field, format!("expected a boolean, found {other}"))),
            },
            EventField::RecurrencePattern => {
                update.recurrence_pattern = Some(match value {
                    Value::Null => None,
                    pattern => Some(pattern.clone()),
                });
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(skip) = applied {
            skipped_fields.push(skip);
        }
    }
    (update, skipped_fields)
}
