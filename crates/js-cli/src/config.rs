//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use js_core::{DEFAULT_DEV_STATE, DEFAULT_SKIPPED_KIND, DEFAULT_STATUS_FIELD, ReportSettings};
use js_jira::{Client, Credentials};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Base URL of the Jira instance, e.g. `https://jira.example.com`.
    pub jira_url: Option<String>,
    pub jira_user: Option<String>,
    pub jira_password: Option<String>,
    /// JQL selecting the tickets to mirror; the update-time clause is appended.
    pub jql_filter: String,
    /// Changelog field that carries status transitions.
    pub status_field: String,
    /// Status counted as development.
    pub dev_state: String,
    /// Issue types left out of the report.
    pub skipped_kinds: Vec<String>,
    /// Offset east of UTC used for weekdays and the noon cut-off.
    pub calendar_offset_minutes: i32,
    /// Offset east of UTC of the Jira user's profile timezone; JQL dates
    /// are read in it.
    pub jira_offset_minutes: i32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("jira_url", &self.jira_url)
            .field("jira_user", &self.jira_user)
            .field(
                "jira_password",
                &self.jira_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jql_filter", &self.jql_filter)
            .field("status_field", &self.status_field)
            .field("dev_state", &self.dev_state)
            .field("skipped_kinds", &self.skipped_kinds)
            .field("calendar_offset_minutes", &self.calendar_offset_minutes)
            .field("jira_offset_minutes", &self.jira_offset_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("jira-stats.db"),
            jira_url: None,
            jira_user: None,
            jira_password: None,
            jql_filter: String::new(),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
            dev_state: DEFAULT_DEV_STATE.to_string(),
            skipped_kinds: vec![DEFAULT_SKIPPED_KIND.to_string()],
            calendar_offset_minutes: 0,
            jira_offset_minutes: 0,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (JIRA_STATS_*)
        figment = figment.merge(Env::prefixed("JIRA_STATS_"));

        figment.extract()
    }

    /// Calendar in which report days are evaluated.
    pub fn calendar(&self) -> Result<FixedOffset> {
        offset_from_minutes("calendar_offset_minutes", self.calendar_offset_minutes)
    }

    /// Timezone in which Jira interprets JQL date literals.
    pub fn jira_offset(&self) -> Result<FixedOffset> {
        offset_from_minutes("jira_offset_minutes", self.jira_offset_minutes)
    }

    pub fn report_settings(&self) -> Result<ReportSettings> {
        Ok(ReportSettings {
            status_field: self.status_field.clone(),
            dev_state: self.dev_state.clone(),
            skipped_kinds: self.skipped_kinds.clone(),
            calendar: self.calendar()?,
        })
    }

    /// Builds a Jira client from the configured URL and credentials.
    pub fn jira_client(&self) -> Result<Client> {
        let url = self
            .jira_url
            .as_deref()
            .context("jira_url is not configured")?;
        let credentials = Credentials {
            user: self
                .jira_user
                .clone()
                .context("jira_user is not configured")?,
            password: self
                .jira_password
                .clone()
                .context("jira_password is not configured")?,
        };
        let client = Client::new(url, credentials).context("failed to create Jira client")?;
        Ok(client.with_jql_offset(self.jira_offset()?))
    }
}

fn offset_from_minutes(key: &str, minutes: i32) -> Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("{key} out of range: {minutes}"))
}

/// Returns the platform-specific config directory for jira-stats.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("jira-stats"))
}

/// Returns the platform-specific data directory for jira-stats.
///
/// On Linux: `~/.local/share/jira-stats`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("jira-stats"))
}
