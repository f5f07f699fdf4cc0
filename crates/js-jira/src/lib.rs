//! Jira REST integration for jira-stats.
//!
//! Provides an incremental issue search (issues updated since a cursor,
//! oldest first, with their changelogs) and the conversion of Jira issues
//! into [`js_core::Ticket`]s.

mod model;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use js_core::format_jql_timestamp;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

pub use model::{
    ChangelogHistory, ChangelogItem, ConvertError, IssueChangelog, IssueFields, JiraIssue,
    JiraUser, NamedField, SearchResults,
};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_PATH: &str = "rest/api/2/search";

/// Largest page Jira serves for a search with expanded changelogs.
pub const MAX_BATCH_SIZE: usize = 400;

/// Jira client errors.
#[derive(Debug, Error)]
pub enum JiraError {
    /// The provided credentials were invalid.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: &'static str },
    /// The base URL could not be parsed.
    #[error("invalid Jira URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Requested page size is outside `1..=MAX_BATCH_SIZE`.
    #[error("batch size must be between 1 and {MAX_BATCH_SIZE}, got {0}")]
    InvalidBatchSize(usize),
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Basic-auth credentials for the Jira REST API.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Jira REST client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    /// Timezone of the Jira user, in which JQL date literals are read.
    jql_offset: FixedOffset,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .field("jql_offset", &self.jql_offset)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client for the Jira instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user or password is empty or whitespace-only,
    /// if the URL does not parse, or if the HTTP client fails to build.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, JiraError> {
        if credentials.user.trim().is_empty() {
            return Err(JiraError::InvalidCredentials {
                reason: "user cannot be empty",
            });
        }
        if credentials.password.trim().is_empty() {
            return Err(JiraError::InvalidCredentials {
                reason: "password cannot be empty",
            });
        }

        let base_url = parse_base_url(base_url)?;

        // Build HTTP client with timeout
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(JiraError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            credentials,
            jql_offset: Utc.fix(),
        })
    }

    /// Sets the timezone of the Jira user's profile. Defaults to UTC.
    #[must_use]
    pub fn with_jql_offset(mut self, offset: FixedOffset) -> Self {
        self.jql_offset = offset;
        self
    }

    /// Searches issues matching `filter` that were updated at or after `since`.
    ///
    /// Results are ordered by update time, oldest first, and carry their
    /// changelogs. At most `max_results` issues are returned.
    pub async fn search_updated_since(
        &self,
        filter: &str,
        since: DateTime<Utc>,
        max_results: usize,
    ) -> Result<SearchResults, JiraError> {
        let url = self.search_url(filter, since, max_results)?;
        tracing::debug!(%url, "searching jira issues");

        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| JiraError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        serde_json::from_str(&body).map_err(|err| JiraError::InvalidResponse(err.to_string()))
    }

    fn search_url(
        &self,
        filter: &str,
        since: DateTime<Utc>,
        max_results: usize,
    ) -> Result<Url, JiraError> {
        if max_results == 0 || max_results > MAX_BATCH_SIZE {
            return Err(JiraError::InvalidBatchSize(max_results));
        }
        let mut url = self
            .base_url
            .join(SEARCH_PATH)
            .map_err(|err| JiraError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: err.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("jql", &build_jql(filter, since, self.jql_offset))
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("expand", "changelog");
        Ok(url)
    }
}

/// Builds the incremental search query: `filter` restricted to issues
/// updated since `since`, oldest update first.
///
/// `since` is written as local time in `offset`, the Jira user's timezone.
pub fn build_jql(filter: &str, since: DateTime<Utc>, offset: FixedOffset) -> String {
    let since = format_jql_timestamp(since, offset);
    let filter = filter.trim();
    if filter.is_empty() {
        format!("updated >= \"{since}\" ORDER BY updated ASC")
    } else {
        format!("({filter}) AND updated >= \"{since}\" ORDER BY updated ASC")
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, JiraError> {
    let trimmed = base_url.trim();
    // Url::join drops the last path segment unless it ends with a slash.
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|err| JiraError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: err.to_string(),
    })
}

fn parse_api_error(body: &str) -> Option<JiraError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ErrorPayload {
        #[serde(default)]
        error_messages: Vec<String>,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .filter(|payload| !payload.error_messages.is_empty())
        .map(|payload| JiraError::Api {
            message: payload.error_messages.join("; "),
        })
}
