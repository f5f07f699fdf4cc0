//! Jira stats CLI library.
//!
//! This crate provides the CLI interface for jira-stats.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, FetchArgs, ReportArgs, TimelineArgs};
pub use config::Config;
