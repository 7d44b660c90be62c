//! Lenient timestamp deserialization.
//!
//! `timestamptz` columns come back as RFC 3339 (`2025-03-01T10:00:00.123+00:00`)
//! while `timestamp` columns have no offset (`2025-03-01T10:00:00.123`). Both
//! are read as UTC. Use with `#[serde(deserialize_with = "...")]`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};

/// Parse a timestamp string with or without an offset.
///
/// # Errors
///
/// Returns `chrono::ParseError` if neither form matches.
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        })
}

/// Deserialize a required timestamp.
///
/// # Errors
///
/// Fails when the value is not a string or does not parse.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse(&value).map_err(D::Error::custom)
}

/// Deserialize an optional timestamp (`null` or absent is `None`).
///
/// # Errors
///
/// Fails when a present value does not parse.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|value| parse(&value).map_err(D::Error::custom))
        .transpose()
}
