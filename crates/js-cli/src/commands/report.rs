//! Report command: development days per ticket inside a date window, as CSV.

use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use js_core::{ReportSettings, ReportWindow, build_report};
use js_db::Database;

use super::util::elapsed_ms;

/// Report parameters taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub start: NaiveDate,
    /// Inclusive last day.
    pub end: NaiveDate,
    pub now: DateTime<Utc>,
    pub total: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    settings: &ReportSettings,
    options: ReportOptions,
) -> Result<()> {
    let window = ReportWindow::from_dates(options.start, options.end, settings.calendar)
        .context("invalid report window")?;

    let started = Instant::now();
    let tickets = db
        .tickets_active_before(window.end())
        .context("failed to load tickets")?;
    tracing::debug!(
        candidates = tickets.len(),
        elapsed_ms = elapsed_ms(started),
        "loaded candidate tickets"
    );

    let started = Instant::now();
    let report = build_report(&tickets, settings, &window, options.now);
    tracing::info!(
        rows = report.len(),
        elapsed_ms = elapsed_ms(started),
        "report computed"
    );

    writeln!(writer, "{}", report.to_csv())?;
    if options.total {
        writeln!(writer, "Total,,,,{},", report.total())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use insta::assert_snapshot;
    use js_core::{Change, ChangelogEntry, Ticket, TicketId, TicketKey};

    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn status(author: &str, from: &str, to: &str, at: DateTime<Utc>) -> ChangelogEntry {
        ChangelogEntry {
            id: format!("{author}-{at}"),
            author: Some(author.to_string()),
            created: at,
            changes: vec![Change {
                field: "status".to_string(),
                from: from.to_string(),
                to: to.to_string(),
            }],
        }
    }

    fn developed(
        key: &str,
        kind: &str,
        title: &str,
        dev: (DateTime<Utc>, DateTime<Utc>),
    ) -> Ticket {
        Ticket {
            id: TicketId::new(format!("id-{key}")).unwrap(),
            key: TicketKey::new(key).unwrap(),
            state: "In Review".to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            create_time: ts(2018, 1, 1, 0, 0),
            update_time: dev.1,
            changelog: vec![
                status("alice", "To Do", "In Development", dev.0),
                status("bob", "In Development", "In Review", dev.1),
            ],
        }
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.store_tickets(&[
            developed(
                "ROB-1",
                "Story",
                "Export, CSV",
                (ts(2018, 2, 1, 10, 0), ts(2018, 2, 2, 19, 0)),
            ),
            developed(
                "ROB-2",
                "Bug",
                "Login",
                (ts(2018, 1, 2, 13, 0), ts(2018, 1, 2, 13, 15)),
            ),
            developed(
                "ROB-3",
                "Epic",
                "Platform",
                (ts(2018, 2, 1, 10, 0), ts(2018, 2, 2, 19, 0)),
            ),
            developed(
                "DL-9",
                "Story",
                "Later work",
                (ts(2018, 5, 1, 10, 0), ts(2018, 5, 2, 19, 0)),
            ),
        ])
        .unwrap();
        db
    }

    fn render(db: &Database, options: ReportOptions) -> String {
        let mut output = Vec::new();
        run(&mut output, db, &ReportSettings::default(), options).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn q1(total: bool) -> ReportOptions {
        ReportOptions {
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 3, 31).unwrap(),
            now: ts(2030, 1, 1, 0, 0),
            total,
        }
    }

    #[test]
    fn report_lists_tickets_with_dev_time() {
        assert_snapshot!(render(&seeded(), q1(false)), @r"
        Key,Type,Summary,Project,Dev Time (days),Primary Dev
        ROB-1,Story,Export  CSV,ROB,2.00,bob
        ROB-2,Bug,Login,ROB,0.25,bob
        ");
    }

    #[test]
    fn report_appends_total_row() {
        assert_snapshot!(render(&seeded(), q1(true)), @r"
        Key,Type,Summary,Project,Dev Time (days),Primary Dev
        ROB-1,Story,Export  CSV,ROB,2.00,bob
        ROB-2,Bug,Login,ROB,0.25,bob
        Total,,,,2.25,
        ");
    }

    #[test]
    fn report_respects_now() {
        let options = ReportOptions {
            now: ts(2018, 1, 15, 0, 0),
            ..q1(false)
        };
        assert_snapshot!(render(&seeded(), options), @r"
        Key,Type,Summary,Project,Dev Time (days),Primary Dev
        ROB-2,Bug,Login,ROB,0.25,bob
        ");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let options = ReportOptions {
            start: NaiveDate::from_ymd_opt(2018, 3, 31).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            ..q1(false)
        };
        let mut output = Vec::new();
        let err = run(&mut output, &seeded(), &ReportSettings::default(), options).unwrap_err();
        assert!(err.to_string().contains("invalid report window"));
    }
}
