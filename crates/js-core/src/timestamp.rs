//! Timestamp sentinels and Jira timestamp parsing.
//!
//! All instants inside the engine are `DateTime<Utc>`. Offsets carried by
//! Jira timestamps are applied during parsing; calendar questions (weekday,
//! hour of day) are answered later in the estimator's configured offset.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use thiserror::Error;

/// Jira changelog/field format: `2018-01-02T13:00:00.000+0100`.
///
/// `%.f` also matches values without fractional seconds.
const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Format understood by JQL date comparisons.
const JQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Earliest representable instant.
///
/// Marks "not yet reached" for the end of development.
pub const BEGINNING_OF_TIME: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Far-future instant (`9999-12-31T23:59:59.999Z`).
///
/// Terminates the open-ended last interval of every timeline and marks
/// "not yet reached" for the start of development.
pub static END_OF_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(|| {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
        .map_or(DateTime::<Utc>::MAX_UTC, |naive| naive.and_utc())
});

/// A timestamp string that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid timestamp for {field}: {value:?}")]
pub struct TimestampError {
    /// Which input carried the value (e.g. `created`, `changelog 1234`).
    pub field: String,
    /// The raw value.
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Parses a Jira timestamp (`YYYY-MM-DDTHH:MM:SS[.fff]±HHMM`) or RFC 3339.
pub fn parse_jira_timestamp(
    field: impl Into<String>,
    value: &str,
) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();
    match DateTime::parse_from_str(trimmed, JIRA_TIMESTAMP_FORMAT) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(source) => DateTime::parse_from_rfc3339(trimmed)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| TimestampError {
                field: field.into(),
                value: value.to_string(),
                source,
            }),
    }
}

/// Formats a timestamp for storage: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a timestamp for a JQL `updated >= "..."` clause.
///
/// JQL date literals carry no offset; Jira reads them in the searching
/// user's timezone, so `offset` must match that profile setting.
pub fn format_jql_timestamp(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .format(JQL_TIMESTAMP_FORMAT)
        .to_string()
}
