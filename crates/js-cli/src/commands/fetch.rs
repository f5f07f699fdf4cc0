//! Fetch command: incremental download of updated tickets.
//!
//! Each run asks Jira for at most one batch of tickets updated since the
//! stored cursor, stores them and moves the cursor to the newest update
//! time seen. A full batch means more tickets are probably waiting.

use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use js_core::{Ticket, format_timestamp};
use js_db::Database;
use js_jira::{JiraIssue, MAX_BATCH_SIZE};

use super::util::{elapsed_ms, format_cursor};
use crate::Config;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Outcome of storing one fetched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub stored: usize,
    /// Cursor after this batch.
    pub last_update: DateTime<Utc>,
    pub more_remaining: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config, batch: usize) -> Result<()> {
    ensure!(
        (1..=MAX_BATCH_SIZE).contains(&batch),
        "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch}"
    );
    let client = config.jira_client()?;
    let since = db.last_update().context("failed to read fetch cursor")?;
    tracing::info!(since = %format_timestamp(since), batch, "fetching updated tickets");

    let started = Instant::now();
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let results = runtime
        .block_on(client.search_updated_since(&config.jql_filter, since, batch))
        .context("failed to search Jira")?;
    tracing::info!(
        count = results.issues.len(),
        total = results.total,
        elapsed_ms = elapsed_ms(started),
        "jira search finished"
    );

    let summary = store_issues(db, results.issues, &config.status_field, batch)?;
    write_summary(writer, &summary)?;
    Ok(())
}

/// Converts and stores a fetched batch, then advances the cursor.
///
/// A conversion failure aborts the whole batch: nothing is stored and the
/// cursor stays where it was.
pub fn store_issues(
    db: &mut Database,
    issues: Vec<JiraIssue>,
    status_field: &str,
    batch: usize,
) -> Result<FetchSummary> {
    let fetched = issues.len();
    let tickets = issues
        .into_iter()
        .map(|issue| issue.into_ticket(status_field))
        .collect::<Result<Vec<Ticket>, _>>()
        .context("failed to convert Jira issue")?;

    let started = Instant::now();
    let stored = db.store_tickets(&tickets).context("failed to store tickets")?;

    let previous = db.last_update()?;
    let last_update = tickets
        .iter()
        .map(|ticket| ticket.update_time)
        .max()
        .map_or(previous, |newest| newest.max(previous));
    if last_update != previous {
        db.store_last_update(last_update)
            .context("failed to store fetch cursor")?;
    }

    let more_remaining = fetched >= batch;
    tracing::info!(
        stored,
        last_update = %format_timestamp(last_update),
        more_remaining,
        elapsed_ms = elapsed_ms(started),
        "tickets stored"
    );

    Ok(FetchSummary {
        stored,
        last_update,
        more_remaining,
    })
}

fn write_summary<W: Write>(writer: &mut W, summary: &FetchSummary) -> Result<()> {
    writeln!(writer, "Stored {} tickets", summary.stored)?;
    writeln!(writer, "Last update: {}", format_cursor(summary.last_update))?;
    if summary.more_remaining {
        writeln!(writer, "More tickets probably remain; run fetch again.")?;
    }
    Ok(())
}
