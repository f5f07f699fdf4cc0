//! Status command for showing the database location and fetch progress.

use std::io::Write;

use anyhow::Result;

use js_db::Database;

use super::util::format_cursor;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let tickets = db.ticket_count()?;
    let cursor = db.last_update()?;

    writeln!(writer, "Jira stats status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Tickets: {tickets}")?;
    writeln!(writer, "Last update: {}", format_cursor(cursor))?;

    Ok(())
}
