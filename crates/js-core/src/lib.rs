//! Core domain logic for jira-stats.
//!
//! This crate contains the fundamental types and logic for:
//! - Timeline reconstruction: turning status transitions into state intervals
//! - Effort estimation: development days spent inside a reporting window
//! - Report rows: per-ticket effort with primary developer attribution
//!
//! Everything here is pure and synchronous; fetching and storage live in
//! `js-jira` and `js-db`.

pub mod effort;
pub mod report;
pub mod ticket;
pub mod timeline;
pub mod timestamp;
mod types;

#[cfg(test)]
mod proptests;

pub use effort::{
    DEFAULT_DEV_STATE, EffortEstimate, EffortEstimator, ReportWindow, WindowError, estimate_days,
};
pub use report::{EffortReport, ReportRow, ReportSettings, TicketEffort, build_report, ticket_effort};
pub use ticket::{
    Change, ChangelogEntry, DEFAULT_SKIPPED_KIND, DEFAULT_STATUS_FIELD, DevSpan, Ticket,
};
pub use timeline::{StateInterval, TransitionEvent, build_intervals};
pub use timestamp::{
    BEGINNING_OF_TIME, END_OF_TIME, TimestampError, format_jql_timestamp, format_timestamp,
    parse_jira_timestamp,
};
pub use types::{TicketId, TicketKey, ValidationError};
