//! Timeline command: the reconstructed state intervals of one stored ticket.

use std::io::Write;

use anyhow::{Context, Result, bail};
use js_core::format_timestamp;
use js_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, key: &str, json: bool) -> Result<()> {
    let Some(ticket) = db
        .get_ticket(key)
        .with_context(|| format!("failed to load ticket {key}"))?
    else {
        bail!("ticket {key} not found; run fetch first");
    };

    let intervals = ticket.intervals(&config.status_field);
    if json {
        let rendered =
            serde_json::to_string_pretty(&intervals).context("failed to serialize intervals")?;
        writeln!(writer, "{rendered}")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{} [{}] {}: {}",
        ticket.key, ticket.kind, ticket.state, ticket.title
    )?;
    for interval in &intervals {
        writeln!(writer, "  {interval}")?;
    }

    let span = ticket.dev_span(&config.status_field, &config.dev_state);
    let start = if span.started() {
        format_timestamp(span.start)
    } else {
        "not started".to_string()
    };
    let end = if span.finished() {
        format_timestamp(span.end)
    } else {
        "not finished".to_string()
    };
    writeln!(writer, "Development: {start} .. {end}")?;
    Ok(())
}
