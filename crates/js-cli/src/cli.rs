//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use crate::commands::fetch::DEFAULT_BATCH_SIZE;

/// Development-time statistics for Jira tickets.
///
/// Mirrors Jira tickets into a local database and estimates how many
/// working days each ticket spent in development.
#[derive(Debug, Parser)]
#[command(name = "jira-stats", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch tickets updated since the last fetch.
    Fetch(FetchArgs),

    /// Print the development-time report as CSV.
    Report(ReportArgs),

    /// Show the state timeline of a stored ticket.
    Timeline(TimelineArgs),

    /// Show database location and fetch progress.
    Status,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Maximum number of tickets to request (at most 400).
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch: usize,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// First day of the report window (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the report window, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub end: NaiveDate,

    /// Evaluate as if it were this instant (RFC 3339); defaults to now.
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Append a total row.
    #[arg(long)]
    pub total: bool,
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Ticket key, e.g. ABC-123.
    pub key: String,

    /// Output intervals as JSON.
    #[arg(long)]
    pub json: bool,
}
