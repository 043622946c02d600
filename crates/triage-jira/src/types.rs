//! Jira Cloud REST v3 wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use triage_core::{Agent, Ticket};

use crate::adf;

/// Fields requested for every issue read.
pub const ISSUE_FIELDS: &[&str] = &[
    "summary",
    "description",
    "reporter",
    "created",
    "priority",
    "status",
    "labels",
    "assignee",
    "resolution",
    "resolutiondate",
];

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: Option<String>,
    /// ADF document, or a plain string on older instances.
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub priority: Option<NamedField>,
    #[serde(default)]
    pub status: Option<NamedField>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub resolution: Option<NamedField>,
    #[serde(default)]
    pub resolutiondate: Option<String>,
}

/// Any `{ "name": ... }` field (priority, status, resolution).
#[derive(Debug, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// `atlassian` for people, `app` for integrations.
    #[serde(default)]
    pub account_type: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub jql: &'a str,
    pub max_results: u32,
    pub fields: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// `{"errorMessages": [...], "errors": {...}}` body of a failed call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraErrorBody {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: serde_json::Map<String, Value>,
}

impl JiraErrorBody {
    pub fn summary(&self) -> String {
        let mut parts = self.error_messages.clone();
        parts.extend(
            self.errors
                .iter()
                .map(|(field, msg)| format!("{}: {}", field, msg.as_str().unwrap_or_default())),
        );
        parts.join("; ")
    }
}

/// Parse Jira's `2024-01-15T10:30:00.000+0000` timestamps, falling back to RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<JiraIssue> for Ticket {
    fn from(issue: JiraIssue) -> Self {
        let f = issue.fields;
        Ticket {
            key: issue.key,
            summary: f.summary.unwrap_or_default(),
            description: f
                .description
                .as_ref()
                .map(adf::to_plain_text)
                .unwrap_or_default(),
            reporter_name: f.reporter.as_ref().map(|r| r.display_name.clone()),
            reporter_email: f.reporter.and_then(|r| r.email_address),
            created_at: f.created.as_deref().and_then(parse_timestamp),
            priority: f.priority.map(|p| p.name),
            status: f.status.map(|s| s.name),
            labels: f.labels,
            assignee: f.assignee.map(|a| a.display_name),
            resolution: f.resolution.map(|r| r.name),
            resolution_date: f.resolutiondate.as_deref().and_then(parse_timestamp),
        }
    }
}

impl From<JiraUser> for Agent {
    fn from(user: JiraUser) -> Self {
        Agent {
            account_id: user.account_id,
            display_name: user.display_name,
            email: user.email_address,
            active: user.active,
        }
    }
}
