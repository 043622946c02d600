//! Core traits for triage collaborators.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// TICKET STORE
// =============================================================================

/// Access to the external issue tracker.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Fetch a single ticket. Missing tickets yield `Error::NotFound`.
    async fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Run a JQL query and return up to `max_results` tickets in store order.
    async fn search_tickets(&self, jql: &str, max_results: u32) -> Result<Vec<Ticket>>;

    /// Count tickets matching a JQL query.
    async fn count_tickets(&self, jql: &str) -> Result<u32>;

    /// Write fields back to a ticket.
    async fn update_ticket(&self, key: &str, update: &TicketUpdate) -> Result<()>;

    /// Assign a ticket to an account.
    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()>;

    /// Add a plain-text comment.
    async fn add_comment(&self, key: &str, text: &str) -> Result<()>;

    /// Users who can be assigned tickets in a project.
    async fn list_assignable_agents(&self, project_key: &str, max_results: u32)
        -> Result<Vec<Agent>>;
}

// =============================================================================
// LLM CHAT
// =============================================================================

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Text returned by a chat backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Backend for hosted chat completion. Treated as fallible and slow.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run a completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion>;

    /// Get the default model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    async fn set(&self, key: &str, value: JsonValue) -> Result<()>;
}
