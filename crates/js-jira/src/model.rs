//! Jira REST wire model and its conversion into domain tickets.

use js_core::{
    Change, ChangelogEntry, Ticket, TicketId, TicketKey, TimestampError, ValidationError,
    parse_jira_timestamp,
};
use serde::Deserialize;
use thiserror::Error;

/// Errors converting a Jira issue into a [`Ticket`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A `created`, `updated` or changelog timestamp is malformed.
    #[error("issue {key}: {source}")]
    Timestamp {
        key: String,
        #[source]
        source: TimestampError,
    },
    /// The issue id or key is empty.
    #[error("issue {key}: {source}")]
    Validation {
        key: String,
        #[source]
        source: ValidationError,
    },
}

/// One page of `/rest/api/2/search` results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub start_at: usize,
    #[serde(default)]
    pub max_results: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Option<IssueChangelog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    pub status: NamedField,
    #[serde(rename = "issuetype")]
    pub issue_type: NamedField,
    pub created: String,
    pub updated: String,
}

/// Jira objects referenced by name (`status`, `issuetype`).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueChangelog {
    #[serde(default)]
    pub histories: Vec<ChangelogHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangelogHistory {
    pub id: String,
    #[serde(default)]
    pub author: Option<JiraUser>,
    pub created: String,
    #[serde(default)]
    pub items: Vec<ChangelogItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl JiraUser {
    /// Login name on Jira Server, display name on Jira Cloud.
    pub fn label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.display_name.as_deref())
            .filter(|label| !label.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogItem {
    pub field: String,
    #[serde(default)]
    pub from_string: Option<String>,
    #[serde(default)]
    pub to_string: Option<String>,
}

impl JiraIssue {
    /// Converts the issue into a ticket, keeping only changes on `status_field`.
    ///
    /// Histories without a matching change are dropped. Any malformed
    /// timestamp fails the whole issue.
    pub fn into_ticket(self, status_field: &str) -> Result<Ticket, ConvertError> {
        let key = self.key;
        let timestamp = |field: String, value: &str| {
            parse_jira_timestamp(field, value).map_err(|source| ConvertError::Timestamp {
                key: key.clone(),
                source,
            })
        };

        let create_time = timestamp("created".to_string(), &self.fields.created)?;
        let update_time = timestamp("updated".to_string(), &self.fields.updated)?;

        let histories = self.changelog.unwrap_or_default().histories;
        let mut changelog = Vec::new();
        for history in histories {
            let changes: Vec<Change> = history
                .items
                .into_iter()
                .filter(|item| item.field.eq_ignore_ascii_case(status_field))
                .map(|item| Change {
                    field: item.field,
                    from: item.from_string.unwrap_or_default(),
                    to: item.to_string.unwrap_or_default(),
                })
                .collect();
            if changes.is_empty() {
                continue;
            }
            let created = timestamp(format!("changelog {}", history.id), &history.created)?;
            changelog.push(ChangelogEntry {
                id: history.id,
                author: history
                    .author
                    .as_ref()
                    .and_then(JiraUser::label)
                    .map(str::to_string),
                created,
                changes,
            });
        }

        let invalid = |source| ConvertError::Validation {
            key: key.clone(),
            source,
        };
        Ok(Ticket {
            id: TicketId::new(self.id).map_err(invalid)?,
            key: TicketKey::new(key.clone()).map_err(invalid)?,
            state: self.fields.status.name,
            kind: self.fields.issue_type.name,
            title: self.fields.summary,
            create_time,
            update_time,
            changelog,
        })
    }
}
