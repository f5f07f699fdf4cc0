//! Per-ticket effort rows for the development-time report.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::effort::{DEFAULT_DEV_STATE, EffortEstimate, EffortEstimator, ReportWindow};
use crate::ticket::{DEFAULT_SKIPPED_KIND, DEFAULT_STATUS_FIELD, Ticket};
use crate::types::TicketKey;

/// CSV header of the report.
pub const REPORT_HEADER: [&str; 6] = [
    "Key",
    "Type",
    "Summary",
    "Project",
    "Dev Time (days)",
    "Primary Dev",
];

/// Knobs shared by every ticket in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub status_field: String,
    pub dev_state: String,
    /// Ticket types skipped before estimation.
    pub skipped_kinds: Vec<String>,
    pub calendar: FixedOffset,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            status_field: DEFAULT_STATUS_FIELD.to_string(),
            dev_state: DEFAULT_DEV_STATE.to_string(),
            skipped_kinds: vec![DEFAULT_SKIPPED_KIND.to_string()],
            calendar: Utc.fix(),
        }
    }
}

impl ReportSettings {
    pub fn estimator(&self) -> EffortEstimator {
        EffortEstimator::new(self.dev_state.clone()).with_calendar(self.calendar)
    }
}

/// Effort computed for one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketEffort {
    pub key: TicketKey,
    pub estimate: EffortEstimate,
    /// Author credited with the most development hours.
    pub primary_dev: Option<String>,
}

/// Estimates one ticket, applying the non-estimable type pre-filter.
pub fn ticket_effort(
    ticket: &Ticket,
    settings: &ReportSettings,
    window: &ReportWindow,
    now: DateTime<Utc>,
) -> TicketEffort {
    if !ticket.is_estimable(&settings.skipped_kinds) {
        tracing::debug!(key = %ticket.key, kind = %ticket.kind, "ticket skipped from dev time calculation");
        return TicketEffort {
            key: ticket.key.clone(),
            estimate: EffortEstimate::ZERO,
            primary_dev: None,
        };
    }

    let estimator = settings.estimator();
    let intervals = ticket.intervals(&settings.status_field);

    let mut total = 0;
    let mut by_author: BTreeMap<&str, u32> = BTreeMap::new();
    for interval in &intervals {
        let hours = estimator.interval_hours(interval, window, now);
        if hours == 0 {
            continue;
        }
        total += hours;
        if let Some(author) = interval.author.as_deref() {
            *by_author.entry(author).or_insert(0) += hours;
        }
    }

    // BTreeMap iterates alphabetically, so ties keep the first author.
    let mut primary_dev: Option<(&str, u32)> = None;
    for (author, hours) in by_author {
        if primary_dev.is_none_or(|(_, best)| hours > best) {
            primary_dev = Some((author, hours));
        }
    }

    TicketEffort {
        key: ticket.key.clone(),
        estimate: EffortEstimate::from_hours(total),
        primary_dev: primary_dev.map(|(author, _)| author.to_string()),
    }
}

/// One CSV line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub key: TicketKey,
    pub kind: String,
    pub summary: String,
    pub project: String,
    pub estimate: EffortEstimate,
    pub primary_dev: Option<String>,
}

impl ReportRow {
    fn entries(&self) -> [String; 6] {
        [
            self.key.to_string(),
            csv_escape(&self.kind),
            csv_escape(&self.summary),
            csv_escape(&self.project),
            self.estimate.to_string(),
            csv_escape(self.primary_dev.as_deref().unwrap_or_default()),
        ]
    }
}

/// Development-time report over a set of tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffortReport {
    rows: Vec<ReportRow>,
}

impl EffortReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum over all rows.
    pub fn total(&self) -> EffortEstimate {
        self.rows.iter().map(|row| row.estimate).sum()
    }

    /// Header and rows joined by newlines, without a trailing newline.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(REPORT_HEADER.join(","));
        for row in &self.rows {
            lines.push(row.entries().join(","));
        }
        lines.join("\n")
    }
}

/// Builds report rows for every ticket with non-zero effort, keeping input order.
///
/// Tickets are estimated in parallel; each estimate only reads its own ticket.
pub fn build_report(
    tickets: &[Ticket],
    settings: &ReportSettings,
    window: &ReportWindow,
    now: DateTime<Utc>,
) -> EffortReport {
    let rows = tickets
        .par_iter()
        .filter_map(|ticket| {
            let effort = ticket_effort(ticket, settings, window, now);
            if effort.estimate.is_zero() {
                return None;
            }
            Some(ReportRow {
                key: effort.key,
                kind: ticket.kind.clone(),
                summary: ticket.title.clone(),
                project: ticket.project().to_string(),
                estimate: effort.estimate,
                primary_dev: effort.primary_dev,
            })
        })
        .collect();

    EffortReport { rows }
}

fn csv_escape(value: &str) -> String {
    value.replace(',', " ")
}
