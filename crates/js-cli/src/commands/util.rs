//! Shared utilities for CLI commands.

use std::time::Instant;

use chrono::{DateTime, Utc};
use js_core::format_timestamp;

/// Milliseconds since `started`, for `elapsed_ms` log fields.
pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Renders the fetch cursor, or `never` before the first fetch.
pub fn format_cursor(cursor: DateTime<Utc>) -> String {
    if cursor == DateTime::UNIX_EPOCH {
        "never".to_string()
    } else {
        format_timestamp(cursor)
    }
}
