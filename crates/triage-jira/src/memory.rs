//! In-process ticket and settings stores.
//!
//! Used by tests and by the server when no Jira site is configured. The ticket
//! store answers the JQL subset in [`crate::jql`] over tickets held in
//! insertion order, and can be told to fail specific lookups.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use triage_core::{Agent, Error, Result, SettingsStore, Ticket, TicketStore, TicketUpdate};

use crate::jql::{self, compare_optional, JqlRecord};

const DONE_STATUSES: &[&str] = &["done", "resolved", "closed"];

#[derive(Debug, Clone)]
struct StoredTicket {
    ticket: Ticket,
    assignee_account: Option<String>,
}

impl JqlRecord for StoredTicket {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "key" => Some(self.ticket.key.clone()),
            "project" => self.ticket.project_key().map(str::to_string),
            "assignee" => self.assignee_account.clone(),
            "status" => self.ticket.status.clone(),
            _ => None,
        }
    }

    fn labels(&self) -> &[String] {
        &self.ticket.labels
    }

    fn text(&self) -> String {
        format!("{}\n{}", self.ticket.summary, self.ticket.description)
    }

    fn is_done(&self) -> bool {
        self.ticket.resolution.is_some()
            || self
                .ticket
                .status
                .as_deref()
                .map(|s| DONE_STATUSES.contains(&s.to_lowercase().as_str()))
                .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct State {
    tickets: Vec<StoredTicket>,
    agents: BTreeMap<String, Vec<Agent>>,
    comments: HashMap<String, Vec<String>>,
    failing_agent_listing: bool,
    failing_search: bool,
    failing_counts: HashSet<String>,
}

/// Ticket store held in memory.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    state: RwLock<State>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a ticket. `assignee_account` is the account id JQL
    /// `assignee = ...` clauses match against.
    pub fn insert_ticket(&self, ticket: Ticket, assignee_account: Option<&str>) {
        let mut state = self.write();
        let stored = StoredTicket {
            ticket,
            assignee_account: assignee_account.map(str::to_string),
        };
        match state
            .tickets
            .iter()
            .position(|t| t.ticket.key == stored.ticket.key)
        {
            Some(pos) => state.tickets[pos] = stored,
            None => state.tickets.push(stored),
        }
    }

    /// Register an assignable agent for a project.
    pub fn add_agent(&self, project_key: &str, agent: Agent) {
        self.write()
            .agents
            .entry(project_key.to_string())
            .or_default()
            .push(agent);
    }

    /// Make `list_assignable_agents` fail with an upstream error.
    pub fn fail_agent_listing(&self, fail: bool) {
        self.write().failing_agent_listing = fail;
    }

    /// Make `search_tickets` fail with an upstream error.
    pub fn fail_search(&self, fail: bool) {
        self.write().failing_search = fail;
    }

    /// Make workload counts for one account fail with an upstream error.
    pub fn fail_count_for(&self, account_id: &str) {
        self.write().failing_counts.insert(account_id.to_string());
    }

    /// Comments added so far, oldest first.
    pub fn comments(&self, key: &str) -> Vec<String> {
        self.read().comments.get(key).cloned().unwrap_or_default()
    }

    /// Account id of the current assignee.
    pub fn assignee_account(&self, key: &str) -> Option<String> {
        self.read()
            .tickets
            .iter()
            .find(|t| t.ticket.key == key)
            .and_then(|t| t.assignee_account.clone())
    }

    fn select(&self, query: &str) -> Result<Vec<StoredTicket>> {
        let query = jql::parse(query)?;
        let state = self.read();
        let mut hits: Vec<StoredTicket> = state
            .tickets
            .iter()
            .filter(|t| query.filter.matches(*t))
            .cloned()
            .collect();

        if let Some(order) = &query.order_by {
            hits.sort_by(|a, b| match order.field.as_str() {
                "resolutiondate" | "resolved" => compare_optional(
                    a.ticket.resolution_date,
                    b.ticket.resolution_date,
                    order.descending,
                ),
                "created" => {
                    compare_optional(a.ticket.created_at, b.ticket.created_at, order.descending)
                }
                _ => {
                    let ord = a.ticket.key.cmp(&b.ticket.key);
                    if order.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
            });
        }
        Ok(hits)
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        self.read()
            .tickets
            .iter()
            .find(|t| t.ticket.key == key)
            .map(|t| t.ticket.clone())
            .ok_or_else(|| Error::NotFound(format!("issue {}", key)))
    }

    async fn search_tickets(&self, jql: &str, max_results: u32) -> Result<Vec<Ticket>> {
        if self.read().failing_search {
            return Err(Error::Upstream("ticket search failed".to_string()));
        }
        let hits = self.select(jql)?;
        debug!(
            subsystem = "jira",
            op = "search",
            jql,
            result_count = hits.len(),
            "Memory search"
        );
        Ok(hits
            .into_iter()
            .take(max_results as usize)
            .map(|t| t.ticket)
            .collect())
    }

    async fn count_tickets(&self, jql: &str) -> Result<u32> {
        let query = jql::parse(jql)?;
        {
            let state = self.read();
            if let Some(account) = query
                .filter
                .values_of("assignee")
                .into_iter()
                .find(|v| state.failing_counts.contains(*v))
            {
                return Err(Error::Upstream(format!("count failed for {}", account)));
            }
        }
        Ok(self.select(jql)?.len() as u32)
    }

    async fn update_ticket(&self, key: &str, update: &TicketUpdate) -> Result<()> {
        let mut state = self.write();
        let stored = state
            .tickets
            .iter_mut()
            .find(|t| t.ticket.key == key)
            .ok_or_else(|| Error::NotFound(format!("issue {}", key)))?;
        if let Some(labels) = &update.labels {
            stored.ticket.labels = labels.clone();
        }
        if let Some(priority) = update.priority {
            stored.ticket.priority = Some(priority.jira_name().to_string());
        }
        Ok(())
    }

    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()> {
        let mut state = self.write();
        let display_name = state
            .agents
            .values()
            .flatten()
            .find(|a| a.account_id == account_id)
            .map(|a| a.display_name.clone());
        let stored = state
            .tickets
            .iter_mut()
            .find(|t| t.ticket.key == key)
            .ok_or_else(|| Error::NotFound(format!("issue {}", key)))?;
        stored.assignee_account = Some(account_id.to_string());
        stored.ticket.assignee = Some(display_name.unwrap_or_else(|| account_id.to_string()));
        Ok(())
    }

    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        let mut state = self.write();
        if !state.tickets.iter().any(|t| t.ticket.key == key) {
            return Err(Error::NotFound(format!("issue {}", key)));
        }
        state
            .comments
            .entry(key.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }

    async fn list_assignable_agents(
        &self,
        project_key: &str,
        max_results: u32,
    ) -> Result<Vec<Agent>> {
        let state = self.read();
        if state.failing_agent_listing {
            return Err(Error::Upstream(format!(
                "assignable users for {} unavailable",
                project_key
            )));
        }
        Ok(state
            .agents
            .get(project_key)
            .map(|agents| agents.iter().take(max_results as usize).cloned().collect())
            .unwrap_or_default())
    }
}

/// Settings held in memory.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}
