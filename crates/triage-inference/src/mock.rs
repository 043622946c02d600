//! Mock chat backend for deterministic testing.
//!
//! Replies are scripted up front and consumed in order; once the script is
//! exhausted every call gets the default reply.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use triage_inference::mock::{MockChatBackend, MockReply};
//!
//! let backend = MockChatBackend::new()
//!     .with_reply(MockReply::network_error())
//!     .with_default_reply(MockReply::text("{}"));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use triage_core::{ChatBackend, ChatCompletion, ChatRequest, Error, Result};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Text(String),
    /// Transport failure, surfaced as `Error::Request`.
    NetworkError,
    /// Non-OK status, surfaced as `Error::Upstream`.
    Status(u16),
    /// Undecodable body, surfaced as `Error::MalformedResponse`.
    Malformed,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn network_error() -> Self {
        MockReply::NetworkError
    }

    fn into_result(self) -> Result<ChatCompletion> {
        match self {
            MockReply::Text(text) => Ok(ChatCompletion { text, usage: None }),
            MockReply::NetworkError => Err(Error::Request("connection refused".to_string())),
            MockReply::Status(status) => Err(Error::Upstream(format!("HTTP {}", status))),
            MockReply::Malformed => Err(Error::MalformedResponse("mock body".to_string())),
        }
    }
}

/// A recorded call to the mock.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub request: ChatRequest,
    pub timestamp: std::time::Instant,
}

/// Mock chat backend for testing.
#[derive(Clone)]
pub struct MockChatBackend {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    default_reply: MockReply,
    latency: Duration,
    model: String,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockChatBackend {
    /// Create a mock whose default reply is an empty string.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: MockReply::text(""),
            latency: Duration::ZERO,
            model: "mock-model".to_string(),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply for the next unscripted call.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.call_log.lock().unwrap().push(MockCall {
            request: request.clone(),
            timestamp: std::time::Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());
        reply.into_result()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            system: None,
            prompt: prompt.to_string(),
            model: String::new(),
            temperature: 0.3,
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn test_script_then_default() {
        let backend = MockChatBackend::new()
            .with_reply(MockReply::network_error())
            .with_reply(MockReply::text("first"))
            .with_default_reply(MockReply::text("later"));

        assert!(matches!(
            backend.complete(&request("a")).await,
            Err(Error::Request(_))
        ));
        assert_eq!(backend.complete(&request("b")).await.unwrap().text, "first");
        assert_eq!(backend.complete(&request("c")).await.unwrap().text, "later");
        assert_eq!(backend.complete(&request("d")).await.unwrap().text, "later");
    }

    #[tokio::test]
    async fn test_call_logging() {
        let backend = MockChatBackend::new();
        backend.complete(&request("hello")).await.unwrap();
        backend.complete(&request("world")).await.unwrap();

        let calls = backend.get_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].request.prompt, "world");
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let backend = MockChatBackend::new()
            .with_reply(MockReply::Status(503))
            .with_reply(MockReply::Malformed);
        assert!(matches!(
            backend.complete(&request("x")).await,
            Err(Error::Upstream(_))
        ));
        assert!(matches!(
            backend.complete(&request("x")).await,
            Err(Error::MalformedResponse(_))
        ));
    }
}
