//! Events and the field table that drives snapshots, updates and rollback.

use crate::error::{CoreError, CoreResult};
use crate::model::deserialize_some;
use crate::types::{EventId, UserId};
use chrono::{DateTime, FixedOffset, Utc};
use kairos_codec::{format_timestamp, Snapshot, Value};
use serde::{Deserialize, Serialize};

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Row id.
    pub id: EventId,
    /// Title, never empty.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Start, with the offset it was given in.
    pub start_time: DateTime<FixedOffset>,
    /// End. Not required to follow `start_time`.
    pub end_time: DateTime<FixedOffset>,
    /// Where it happens.
    pub location: Option<String>,
    /// Creator. Ownership never transfers.
    pub owner_id: UserId,
    /// Whether the event repeats.
    pub is_recurring: bool,
    /// Opaque recurrence rule, stored as given.
    pub recurrence_pattern: Option<Value>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

/// Persisted fields of an [`Event`], in snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventField {
    /// `id`
    Id,
    /// `title`
    Title,
    /// `description`
    Description,
    /// `start_time`
    StartTime,
    /// `end_time`
    EndTime,
    /// `location`
    Location,
    /// `owner_id`
    OwnerId,
    /// `is_recurring`
    IsRecurring,
    /// `recurrence_pattern`
    RecurrencePattern,
    /// `created_at`
    CreatedAt,
    /// `updated_at`
    UpdatedAt,
}

impl EventField {
    /// Every persisted field.
    pub const ALL: [Self; 11] = [
        Self::Id,
        Self::Title,
        Self::Description,
        Self::StartTime,
        Self::EndTime,
        Self::Location,
        Self::OwnerId,
        Self::IsRecurring,
        Self::RecurrencePattern,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// Fields a rollback copies back from a stored version.
    pub const RESTORABLE: [Self; 7] = [
        Self::Title,
        Self::Description,
        Self::StartTime,
        Self::EndTime,
        Self::Location,
        Self::IsRecurring,
        Self::RecurrencePattern,
    ];

    /// The persisted field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Location => "location",
            Self::OwnerId => "owner_id",
            Self::IsRecurring => "is_recurring",
            Self::RecurrencePattern => "recurrence_pattern",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Looks a field up by its persisted name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Whether the field holds a datetime.
    #[must_use]
    pub const fn is_timestamp(self) -> bool {
        matches!(
            self,
            Self::StartTime | Self::EndTime | Self::CreatedAt | Self::UpdatedAt
        )
    }

    /// Whether the field is maintained by the store rather than by callers.
    #[must_use]
    pub const fn is_system(self) -> bool {
        matches!(
            self,
            Self::Id | Self::OwnerId | Self::CreatedAt | Self::UpdatedAt
        )
    }

    /// Whether a rollback may restore the field.
    #[must_use]
    pub const fn is_restorable(self) -> bool {
        !self.is_system()
    }
}

fn text_value(text: &Option<String>) -> Value {
    text.clone().map_or(Value::Null, Value::String)
}

fn time_value<Tz: chrono::TimeZone>(ts: &DateTime<Tz>) -> Value {
    Value::String(format_timestamp(ts))
}

impl Event {
    /// The normalized value of one field.
    #[must_use]
    pub fn field_value(&self, field: EventField) -> Value {
        match field {
            EventField::Id => Value::from(self.id.as_u64()),
            EventField::Title => Value::String(self.title.clone()),
            EventField::Description => text_value(&self.description),
            EventField::StartTime => time_value(&self.start_time),
            EventField::EndTime => time_value(&self.end_time),
            EventField::Location => text_value(&self.location),
            EventField::OwnerId => Value::from(self.owner_id.as_u64()),
            EventField::IsRecurring => Value::Bool(self.is_recurring),
            EventField::RecurrencePattern => {
                self.recurrence_pattern.clone().unwrap_or(Value::Null)
            }
            EventField::CreatedAt => time_value(&self.created_at),
            EventField::UpdatedAt => time_value(&self.updated_at),
        }
    }

    /// Renders every persisted field with datetimes in canonical text.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        EventField::ALL
            .into_iter()
            .map(|field| (field.name().to_string(), self.field_value(field)))
            .collect()
    }
}

fn check_text(field: &str, value: &str, max_len: usize) -> CoreResult<()> {
    if value.chars().count() > max_len {
        return Err(CoreError::validation(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

fn check_title(title: &str, max_len: usize) -> CoreResult<()> {
    if title.trim().is_empty() {
        return Err(CoreError::validation("title", "must not be empty"));
    }
    check_text("title", title, max_len)
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Start.
    pub start_time: DateTime<FixedOffset>,
    /// End.
    pub end_time: DateTime<FixedOffset>,
    /// Location.
    #[serde(default)]
    pub location: Option<String>,
    /// Repeats.
    #[serde(default)]
    pub is_recurring: bool,
    /// Recurrence rule.
    #[serde(default)]
    pub recurrence_pattern: Option<Value>,
}

impl NewEvent {
    /// A non-recurring event with only the required fields.
    pub fn new(
        title: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_time,
            end_time,
            location: None,
            is_recurring: false,
            recurrence_pattern: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Marks the event recurring with the given rule.
    #[must_use]
    pub fn with_recurrence(mut self, pattern: Value) -> Self {
        self.is_recurring = true;
        self.recurrence_pattern = Some(pattern);
        self
    }

    /// Checks title and location against the text limits.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self, max_len: usize) -> CoreResult<()> {
        check_title(&self.title, max_len)?;
        if let Some(location) = &self.location {
            check_text("location", location, max_len)?;
        }
        Ok(())
    }

    pub(crate) fn into_event(self, id: EventId, owner_id: UserId, now: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            owner_id,
            is_recurring: self.is_recurring,
            recurrence_pattern: self.recurrence_pattern,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update: only `Some` fields are applied.
///
/// Nullable fields use `Option<Option<T>>` so "set to null" (`Some(None)`)
/// is distinct from "leave alone" (`None`). In JSON an explicit `null`
/// clears the field and a missing key leaves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// New start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,
    /// New end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<FixedOffset>>,
    /// New location, or `Some(None)` to clear it.
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    /// New recurrence flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    /// New recurrence rule, or `Some(None)` to clear it.
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub recurrence_pattern: Option<Option<Value>>,
}

impl EventUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets or clears the description.
    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the start.
    #[must_use]
    pub fn start_time(mut self, start: DateTime<FixedOffset>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the end.
    #[must_use]
    pub fn end_time(mut self, end: DateTime<FixedOffset>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Sets or clears the location.
    #[must_use]
    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the recurrence flag.
    #[must_use]
    pub fn is_recurring(mut self, recurring: bool) -> Self {
        self.is_recurring = Some(recurring);
        self
    }

    /// Sets or clears the recurrence rule.
    #[must_use]
    pub fn recurrence_pattern(mut self, pattern: Option<Value>) -> Self {
        self.recurrence_pattern = Some(pattern);
        self
    }

    /// Whether no field is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_fields().is_empty()
    }

    /// The supplied fields, in snapshot order.
    #[must_use]
    pub fn set_fields(&self) -> Vec<EventField> {
        EventField::RESTORABLE
            .into_iter()
            .filter(|field| self.field_value(*field).is_some())
            .collect()
    }

    /// The normalized value this update would write to `field`.
    #[must_use]
    pub fn field_value(&self, field: EventField) -> Option<Value> {
        match field {
            EventField::Title => self.title.clone().map(Value::String),
            EventField::Description => self.description.as_ref().map(text_value),
            EventField::StartTime => self.start_time.as_ref().map(|ts| time_value(ts)),
            EventField::EndTime => self.end_time.as_ref().map(|ts| time_value(ts)),
            EventField::Location => self.location.as_ref().map(text_value),
            EventField::IsRecurring => self.is_recurring.map(Value::Bool),
            EventField::RecurrencePattern => self
                .recurrence_pattern
                .as_ref()
                .map(|pattern| pattern.clone().unwrap_or(Value::Null)),
            _ => None,
        }
    }

    /// The supplied fields rendered the way [`Event::snapshot`] renders them.
    #[must_use]
    pub fn to_partial_snapshot(&self) -> Snapshot {
        EventField::RESTORABLE
            .into_iter()
            .filter_map(|field| {
                self.field_value(field)
                    .map(|value| (field.name().to_string(), value))
            })
            .collect()
    }

    /// Writes every supplied field into `event`.
    ///
    /// This does not touch `updated_at`; callers stamp it.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(start) = self.start_time {
            event.start_time = start;
        }
        if let Some(end) = self.end_time {
            event.end_time = end;
        }
        if let Some(location) = &self.location {
            event.location.clone_from(location);
        }
        if let Some(recurring) = self.is_recurring {
            event.is_recurring = recurring;
        }
        if let Some(pattern) = &self.recurrence_pattern {
            event.recurrence_pattern.clone_from(pattern);
        }
    }

    /// Checks supplied text fields against the limits.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self, max_len: usize) -> CoreResult<()> {
        if let Some(title) = &self.title {
            check_title(title, max_len)?;
        }
        if let Some(Some(location)) = &self.location {
            check_text("location", location, max_len)?;
        }
        Ok(())
    }
}
