//! CLI subcommand implementations.

pub mod fetch;
pub mod report;
pub mod status;
pub mod timeline;
mod util;
