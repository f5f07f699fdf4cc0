//! Ticket model reconstructed from the issue tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline::{StateInterval, TransitionEvent, build_intervals};
use crate::timestamp::{BEGINNING_OF_TIME, END_OF_TIME};
use crate::types::{TicketId, TicketKey};

/// Changelog field carrying status transitions.
pub const DEFAULT_STATUS_FIELD: &str = "status";

/// Ticket type excluded from effort estimation by default.
pub const DEFAULT_SKIPPED_KIND: &str = "Epic";

/// A single field change inside a changelog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub field: String,
    pub from: String,
    pub to: String,
}

/// One changelog record: who changed what, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created: DateTime<Utc>,
    pub changes: Vec<Change>,
}

impl ChangelogEntry {
    /// Returns the first change on `field`, compared case-insensitively.
    pub fn change_on(&self, field: &str) -> Option<&Change> {
        self.changes
            .iter()
            .find(|change| change.field.eq_ignore_ascii_case(field))
    }
}

/// An issue with its full changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub key: TicketKey,
    /// Current status name.
    pub state: String,
    /// Issue type name (e.g. `Story`, `Bug`, `Epic`).
    pub kind: String,
    pub title: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    #[serde(default)]
    pub changelog: Vec<ChangelogEntry>,
}

/// First entry into and last exit from the development state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevSpan {
    /// [`END_OF_TIME`] if development never started.
    pub start: DateTime<Utc>,
    /// [`BEGINNING_OF_TIME`] if development never ended.
    pub end: DateTime<Utc>,
}

impl DevSpan {
    pub fn started(&self) -> bool {
        self.start != *END_OF_TIME
    }

    pub fn finished(&self) -> bool {
        self.end != BEGINNING_OF_TIME
    }
}

impl Ticket {
    /// Project part of the ticket key.
    pub fn project(&self) -> &str {
        self.key.project()
    }

    /// Status transitions in changelog order (not sorted).
    pub fn transition_events(&self, status_field: &str) -> Vec<TransitionEvent> {
        self.changelog
            .iter()
            .filter_map(|entry| {
                entry.change_on(status_field).map(|change| TransitionEvent {
                    from_state: change.from.clone(),
                    to_state: change.to.clone(),
                    timestamp: entry.created,
                    author: entry.author.clone(),
                })
            })
            .collect()
    }

    /// Reconstructs the state timeline of this ticket.
    pub fn intervals(&self, status_field: &str) -> Vec<StateInterval> {
        build_intervals(
            self.create_time,
            &self.state,
            &self.transition_events(status_field),
        )
    }

    pub fn dev_span(&self, status_field: &str, dev_state: &str) -> DevSpan {
        let mut span = DevSpan {
            start: *END_OF_TIME,
            end: BEGINNING_OF_TIME,
        };
        for event in self.transition_events(status_field) {
            if event.to_state == dev_state && event.timestamp < span.start {
                span.start = event.timestamp;
            }
            if event.from_state == dev_state && event.timestamp > span.end {
                span.end = event.timestamp;
            }
        }
        span
    }

    /// False for ticket types that aggregate other work (epics by default).
    pub fn is_estimable(&self, skipped_kinds: &[String]) -> bool {
        !skipped_kinds.iter().any(|kind| kind == &self.kind)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{status_entry, ticket, ts};
    use super::*;

    #[test]
    fn transition_events_ignore_other_fields() {
        let mut t = ticket("ROB-1", "Closed", "2006-01-01T13:04:05");
        t.changelog = vec![
            ChangelogEntry {
                id: "1".to_string(),
                author: None,
                created: ts("2006-01-01T15:04:05"),
                changes: vec![Change {
                    field: "Description".to_string(),
                    from: "PrevPrev".to_string(),
                    to: "Prev".to_string(),
                }],
            },
            ChangelogEntry {
                id: "2".to_string(),
                author: Some("alice".to_string()),
                created: ts("2006-01-02T15:04:05"),
                changes: vec![
                    Change {
                        field: "Description".to_string(),
                        from: "Prev".to_string(),
                        to: "Current".to_string(),
                    },
                    Change {
                        field: "Status".to_string(),
                        from: "To Do".to_string(),
                        to: "Closed".to_string(),
                    },
                ],
            },
        ];

        let events = t.transition_events(DEFAULT_STATUS_FIELD);

        assert_eq!(
            events,
            vec![TransitionEvent {
                from_state: "To Do".to_string(),
                to_state: "Closed".to_string(),
                timestamp: ts("2006-01-02T15:04:05"),
                author: Some("alice".to_string()),
            }]
        );
    }

    #[test]
    fn intervals_cover_creation_to_end_of_time() {
        let mut t = ticket("ROB-2", "In Review", "2018-01-01T00:00:00");
        t.changelog = vec![
            status_entry("dev", "In Development", "In Review", "2018-02-05T23:59:59"),
            status_entry("dev", "To Do", "In Development", "2018-01-02T00:00:00"),
        ];

        let intervals = t.intervals(DEFAULT_STATUS_FIELD);

        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[0].start, t.create_time);
        assert_eq!(intervals[2].end, *END_OF_TIME);
        assert_eq!(intervals[2].state, "In Review");
    }

    #[test]
    fn dev_span_tracks_first_entry_and_last_exit() {
        let mut t = ticket("ROB-3", "Done", "2020-02-01T09:00:00");
        t.changelog = vec![
            status_entry("a", "To Do", "In Development", "2020-02-02T09:00:00"),
            status_entry("a", "In Development", "In Review", "2020-02-03T19:00:00"),
            status_entry("b", "In Review", "In Development", "2020-02-04T07:00:00"),
            status_entry("b", "In Development", "Done", "2020-02-06T11:00:00"),
        ];

        let span = t.dev_span(DEFAULT_STATUS_FIELD, "In Development");

        assert_eq!(span.start, ts("2020-02-02T09:00:00"));
        assert_eq!(span.end, ts("2020-02-06T11:00:00"));
        assert!(span.started());
        assert!(span.finished());
    }

    #[test]
    fn dev_span_defaults_to_sentinels() {
        let t = ticket("ROB-4", "Open", "2020-02-01T09:00:00");
        let span = t.dev_span(DEFAULT_STATUS_FIELD, "In Development");
        assert_eq!(span.start, *END_OF_TIME);
        assert_eq!(span.end, BEGINNING_OF_TIME);
        assert!(!span.started());
        assert!(!span.finished());
    }

    #[test]
    fn epics_are_not_estimable() {
        let mut t = ticket("ROB-5", "Open", "2020-02-01T09:00:00");
        let skipped = vec![DEFAULT_SKIPPED_KIND.to_string()];
        assert!(t.is_estimable(&skipped));
        t.kind = "Epic".to_string();
        assert!(!t.is_estimable(&skipped));
        assert!(t.is_estimable(&[]));
    }

    #[test]
    fn ticket_serde_roundtrip() {
        let mut t = ticket("ROB-6", "In Review", "2018-01-01T00:00:00");
        t.changelog = vec![status_entry(
            "dev",
            "To Do",
            "In Development",
            "2018-01-02T00:00:00",
        )];

        let json = serde_json::to_string(&t).unwrap();
        let parsed: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
        assert_eq!(parsed.project(), "ROB");
    }
}
