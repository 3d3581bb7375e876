//! Dotted-path lookups into backend documents.
//!
//! Documents are arbitrary JSON. A path such as `payload.values.0.temp` walks
//! one level per segment: object members by key, array elements by decimal
//! index. A missing member, an out-of-range index, a scalar in the middle of
//! the path or an explicit `null` all resolve to `None`.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// The timestamp field used when a target doesn't name one.
pub static DEFAULT_TIMESTAMP_FIELD: &str = "updatedAt";

/// Timestamp fields tried in order when timestamp inference is enabled and
/// the target doesn't name a field.
pub static TIMESTAMP_FIELDS: [&str; 2] = ["updatedAt", "createdAt"];

/// Resolves a dotted path in `doc`.
#[must_use]
pub fn extract_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// How the timestamp of a document is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLookup<'a> {
    /// Resolve exactly this (possibly nested) field.
    Field(&'a str),
    /// Try each of [`TIMESTAMP_FIELDS`] at the top level of the document.
    Infer,
}

/// Resolves and parses the timestamp of `doc`.
///
/// Absence of a value is not an error, it simply yields `None`.
#[must_use]
pub fn extract_timestamp(doc: &Value, lookup: TimestampLookup<'_>) -> Option<DateTime<Utc>> {
    timestamp_value(doc, lookup).and_then(parse_timestamp)
}

/// Resolves the raw, non-null timestamp value of `doc` without parsing it.
#[must_use]
pub fn timestamp_value<'a>(doc: &'a Value, lookup: TimestampLookup<'_>) -> Option<&'a Value> {
    match lookup {
        TimestampLookup::Field(field) => extract_value(doc, field),
        TimestampLookup::Infer => TIMESTAMP_FIELDS
            .iter()
            .find_map(|field| doc.as_object()?.get(*field).filter(|v| !v.is_null())),
    }
}

/// Interprets a JSON value as a point in time.
///
/// Numbers are epoch milliseconds, strings are ISO-8601 date-times (an
/// offset-less string is taken as UTC) or plain dates.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&time));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| Utc.from_utc_datetime(&time))
}
