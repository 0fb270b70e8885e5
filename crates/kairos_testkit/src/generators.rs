//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that passes event validation.

use chrono::{DateTime, FixedOffset};
use kairos_codec::Value;
use kairos_core::{EventUpdate, NewEvent};
use proptest::prelude::*;
use serde_json::json;

/// Strategy for valid titles: 1 to 40 characters, never blank.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,39}").expect("Invalid regex")
}

/// Strategy for optional free text such as descriptions and locations.
pub fn optional_text_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-z0-9 ]{0,24}").expect("Invalid regex"))
}

/// Strategy for whole-second datetimes between 2020 and 2030 at a whole-hour
/// offset.
pub fn datetime_strategy() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (1_577_836_800i64..1_893_456_000i64, -11i32..=14i32).prop_filter_map(
        "Datetime out of range",
        |(secs, hours)| {
            let offset = FixedOffset::east_opt(hours * 3600)?;
            let utc = DateTime::from_timestamp(secs, 0)?;
            Some(utc.with_timezone(&offset))
        },
    )
}

/// Strategy for small recurrence rules.
pub fn recurrence_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["daily", "weekly", "monthly"]),
        1u32..5,
    )
        .prop_map(|(freq, interval)| json!({"freq": freq, "interval": interval}))
}

/// Strategy for valid new events.
pub fn new_event_strategy() -> impl Strategy<Value = NewEvent> {
    (
        title_strategy(),
        optional_text_strategy(),
        datetime_strategy(),
        datetime_strategy(),
        optional_text_strategy(),
        prop::option::of(recurrence_strategy()),
    )
        .prop_map(|(title, description, start, end, location, pattern)| {
            let mut new = NewEvent::new(title, start, end);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(location) = location {
                new = new.with_location(location);
            }
            if let Some(pattern) = pattern {
                new = new.with_recurrence(pattern);
            }
            new
        })
}

/// Strategy for valid partial updates, possibly empty.
///
/// Nullable fields are either left out, cleared, or given a value.
pub fn event_update_strategy() -> impl Strategy<Value = EventUpdate> {
    (
        prop::option::of(title_strategy()),
        prop::option::of(optional_text_strategy()),
        prop::option::of(datetime_strategy()),
        prop::option::of(datetime_strategy()),
        prop::option::of(optional_text_strategy()),
        prop::option::of(any::<bool>()),
        prop::option::of(prop::option::of(recurrence_strategy())),
    )
        .prop_map(
            |(title, description, start, end, location, recurring, pattern)| EventUpdate {
                title,
                description,
                start_time: start,
                end_time: end,
                location,
                is_recurring: recurring,
                recurrence_pattern: pattern,
            },
        )
}
