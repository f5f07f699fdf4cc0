//! Timeline reconstruction from status transitions.
//!
//! A ticket's life is split into contiguous, half-open state intervals:
//! from the creation time through every recorded transition, ending with an
//! open interval (terminated by [`END_OF_TIME`]) in the ticket's current
//! state.
//!
//! The builder trusts timestamps, not the state chain: an event whose
//! `from_state` does not match the previous `to_state` is used as-is.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::END_OF_TIME;

/// A single recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from_state: String,
    pub to_state: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A half-open span `[start, end)` during which a ticket held one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInterval {
    pub start: DateTime<Utc>,
    /// Exclusive end; [`END_OF_TIME`] for the current state.
    pub end: DateTime<Utc>,
    pub state: String,
    /// Author of the transition that closed this interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl StateInterval {
    /// Returns true if this is the open-ended interval of the current state.
    pub fn is_open(&self) -> bool {
        self.end == *END_OF_TIME
    }
}

impl fmt::Display for StateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = if self.is_open() {
            "open".to_string()
        } else {
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        };
        write!(
            f,
            "{} .. {} {}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end,
            self.state
        )?;
        if let Some(author) = &self.author {
            write!(f, " ({author})")?;
        }
        Ok(())
    }
}

/// Builds the ordered interval sequence for one ticket.
///
/// Events may arrive in any order; they are stably sorted by timestamp, so
/// events sharing a timestamp keep their input order. The result always
/// holds `events.len() + 1` intervals and its last interval is
/// `[last transition, END_OF_TIME)` in `current_state`.
pub fn build_intervals(
    create_time: DateTime<Utc>,
    current_state: &str,
    events: &[TransitionEvent],
) -> Vec<StateInterval> {
    let mut sorted: Vec<&TransitionEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.timestamp);

    let mut intervals = Vec::with_capacity(sorted.len() + 1);
    let mut cursor = create_time;
    for event in sorted {
        intervals.push(StateInterval {
            start: cursor,
            end: event.timestamp,
            state: event.from_state.clone(),
            author: event.author.clone(),
        });
        cursor = event.timestamp;
    }

    intervals.push(StateInterval {
        start: cursor,
        end: *END_OF_TIME,
        state: current_state.to_string(),
        author: None,
    });

    intervals
}
