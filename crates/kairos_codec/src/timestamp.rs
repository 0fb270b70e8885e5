//! Canonical datetime text.
//!
//! Every datetime stored in a snapshot is rendered as ISO-8601 with its UTC
//! offset spelled out (`2024-01-01T09:00:00+00:00`). Sub-second digits only
//! appear when non-zero.

use crate::error::{CodecError, CodecResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Renders a datetime in its canonical snapshot form.
pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    ts.fixed_offset()
        .to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Reads a datetime back from snapshot text.
///
/// Accepts the canonical form plus the looser spellings older snapshots and
/// hand-edited payloads use: a trailing `Z`, a space instead of `T`, missing
/// seconds, or no offset at all (read as UTC). A bare date is midnight UTC.
///
/// # Errors
///
/// Returns [`CodecError::InvalidTimestamp`] when none of the accepted forms
/// match.
pub fn parse_timestamp(text: &str) -> CodecResult<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }

    let zulu = text
        .strip_suffix('Z')
        .or_else(|| text.strip_suffix('z'))
        .map(|rest| format!("{rest}+00:00"));
    let with_offset = zulu.as_deref().unwrap_or(text);
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(with_offset, format) {
            return Ok(ts);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| CodecError::invalid_timestamp(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn utc_renders_with_explicit_offset() {
        assert_eq!(
            format_timestamp(&utc("2024-01-01T09:00:00Z")),
            "2024-01-01T09:00:00+00:00"
        );
    }

    #[test]
    fn fractional_seconds_only_when_present() {
        let ts = utc("2024-01-01T09:00:00Z").with_nanosecond(250_000_000).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01T09:00:00.250+00:00");
    }

    #[test]
    fn offset_is_preserved() {
        let ts = DateTime::parse_from_rfc3339("2024-06-01T18:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-06-01T18:30:00+02:00");
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap().offset(), ts.offset());
    }

    #[test]
    fn accepts_loose_spellings() {
        let expected = utc("2024-01-01T09:00:00Z");
        for text in [
            "2024-01-01T09:00Z",
            "2024-01-01T09:00:00Z",
            "2024-01-01 09:00:00+00:00",
            "2024-01-01T09:00:00",
            "2024-01-01 09:00",
        ] {
            assert_eq!(parse_timestamp(text).unwrap(), expected, "{text}");
        }
        assert_eq!(
            parse_timestamp("2024-01-01").unwrap(),
            utc("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parse_timestamp("next tuesday"),
            Err(CodecError::invalid_timestamp("next tuesday"))
        );
    }
}
