//! Jira Cloud REST v3 client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use triage_core::{Agent, Error, Result, Ticket, TicketStore, TicketUpdate};

use crate::adf;
use crate::config::JiraConfig;
use crate::types::*;

/// Ticket store backed by a Jira Cloud site.
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
    auth_header: String,
}

fn basic_auth(email: &str, token: &str) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    format!("Basic {}", STANDARD.encode(format!("{}:{}", email, token)))
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "jira",
            base_url = %config.base_url,
            "Initializing Jira client"
        );

        let auth_header = basic_auth(&config.email, &config.api_token);
        Ok(Self {
            client,
            config,
            auth_header,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(JiraConfig::from_env())
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    /// Send a request and map non-2xx statuses onto the error taxonomy.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: JiraErrorBody = response.json().await.unwrap_or_default();
        let detail = body.summary();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(if detail.is_empty() {
                what.to_string()
            } else {
                format!("{}: {}", what, detail)
            }));
        }
        warn!(
            subsystem = "jira",
            status = status.as_u16(),
            error = %detail,
            "Jira call failed: {}",
            what
        );
        Err(Error::Upstream(format!(
            "Jira returned {} for {}: {}",
            status.as_u16(),
            what,
            detail
        )))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(req, what).await?;
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("{}: {}", what, e)))
    }
}

#[async_trait]
impl TicketStore for JiraClient {
    #[instrument(skip(self), fields(subsystem = "jira", op = "get_ticket", issue_key = %key))]
    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let req = self
            .request(Method::GET, &format!("/rest/api/3/issue/{}", key))
            .query(&[("fields", ISSUE_FIELDS.join(","))]);
        let issue: JiraIssue = self.send_json(req, &format!("issue {}", key)).await?;
        Ok(issue.into())
    }

    #[instrument(skip(self), fields(
        subsystem = "jira",
        op = "search",
        result_count = tracing::field::Empty,
    ))]
    async fn search_tickets(&self, jql: &str, max_results: u32) -> Result<Vec<Ticket>> {
        let start = Instant::now();
        let req = self.request(Method::POST, "/rest/api/3/search").json(&SearchRequest {
            jql,
            max_results,
            fields: ISSUE_FIELDS,
        });
        let response: SearchResponse = self.send_json(req, "search").await?;
        let tickets: Vec<Ticket> = response.issues.into_iter().map(Ticket::from).collect();

        tracing::Span::current().record("result_count", tickets.len());
        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Jira search complete"
        );
        Ok(tickets)
    }

    #[instrument(skip(self), fields(subsystem = "jira", op = "count"))]
    async fn count_tickets(&self, jql: &str) -> Result<u32> {
        let req = self.request(Method::POST, "/rest/api/3/search").json(&SearchRequest {
            jql,
            max_results: 0,
            fields: &[],
        });
        let response: SearchResponse = self.send_json(req, "count").await?;
        response
            .total
            .ok_or_else(|| Error::MalformedResponse("count: missing total".to_string()))
    }

    #[instrument(skip(self, update), fields(subsystem = "jira", op = "update", issue_key = %key))]
    async fn update_ticket(&self, key: &str, update: &TicketUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let mut fields = serde_json::Map::new();
        if let Some(labels) = &update.labels {
            fields.insert("labels".to_string(), json!(labels));
        }
        if let Some(priority) = update.priority {
            fields.insert("priority".to_string(), json!({ "id": priority.jira_id() }));
        }
        let req = self
            .request(Method::PUT, &format!("/rest/api/3/issue/{}", key))
            .json(&json!({ "fields": fields }));
        self.send(req, &format!("update {}", key)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "jira", op = "assign", issue_key = %key))]
    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()> {
        let req = self
            .request(Method::PUT, &format!("/rest/api/3/issue/{}/assignee", key))
            .json(&json!({ "accountId": account_id }));
        self.send(req, &format!("assign {}", key)).await?;
        Ok(())
    }

    #[instrument(skip(self, text), fields(subsystem = "jira", op = "comment", issue_key = %key))]
    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        let req = self
            .request(Method::POST, &format!("/rest/api/3/issue/{}/comment", key))
            .json(&json!({ "body": adf::from_plain_text(text) }));
        self.send(req, &format!("comment {}", key)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(
        subsystem = "jira",
        op = "list_agents",
        project_key = %project_key,
    ))]
    async fn list_assignable_agents(
        &self,
        project_key: &str,
        max_results: u32,
    ) -> Result<Vec<Agent>> {
        let req = self
            .request(Method::GET, "/rest/api/3/user/assignable/search")
            .query(&[
                ("project", project_key.to_string()),
                ("maxResults", max_results.to_string()),
            ]);
        let users: Vec<JiraUser> = self
            .send_json(req, &format!("assignable users for {}", project_key))
            .await?;

        // Integrations (automation bots, apps) cannot work tickets.
        Ok(users
            .into_iter()
            .filter(|u| u.account_type.as_deref().map_or(true, |t| t == "atlassian"))
            .map(Agent::from)
            .collect())
    }
}
