//! OpenAI-compatible chat backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use triage_core::defaults;
use triage_core::{ChatBackend, ChatCompletion, ChatRequest, Error, Result, TokenUsage};

use super::error::{to_triage_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model used when a request does not name one.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Ask the server for `response_format: json_object`.
    pub json_mode: bool,
    /// HTTP-Referer header for OpenRouter.ai rankings (optional).
    pub http_referer: Option<String>,
    /// X-Title header for app name on OpenRouter.ai (optional).
    pub x_title: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_URL.to_string(),
            api_key: None,
            model: defaults::LLM_MODEL.to_string(),
            timeout_seconds: defaults::LLM_TIMEOUT_SECS,
            json_mode: true,
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenAIConfig {
    /// Read `LLM_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(base.base_url),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or(base.model),
            timeout_seconds: std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.timeout_seconds),
            json_mode: std::env::var("LLM_JSON_MODE")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(base.json_mode),
            http_referer: std::env::var("LLM_HTTP_REFERER").ok(),
            x_title: std::env::var("LLM_X_TITLE").ok(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "LLM base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.model.is_empty() {
            return Err(Error::Config("LLM model cannot be empty".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("LLM timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// OpenAI-compatible chat backend.
pub struct OpenAIChatBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIChatBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI chat backend: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        // Add OpenRouter-specific headers if configured
        if let Some(ref referer) = self.config.http_referer {
            req = req.header("HTTP-Referer", referer);
        }

        if let Some(ref title) = self.config.x_title {
            req = req.header("X-Title", title);
        }

        req.header("Content-Type", "application/json")
    }
}

#[async_trait]
impl ChatBackend for OpenAIChatBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        debug!(
            "Completing with model {}, prompt length: {}",
            model,
            request.prompt.len()
        );

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(request.prompt.as_str()));

        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            response_format: self.config.json_mode.then(ResponseFormat::json_object),
        };

        let response = self
            .build_request("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("LLM request timed out: {}", e))
                } else {
                    Error::Request(format!("LLM request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
                error: OpenAIError {
                    message: "Unknown error".to_string(),
                    error_type: "unknown".to_string(),
                    code: None,
                },
            });
            let code = OpenAIErrorCode::from_response(status, &body.error.error_type);
            return Err(to_triage_error(code, status, &body.error.message));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("Completion finished, response length: {}", text.len());
        Ok(ChatCompletion {
            text,
            usage: result.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, defaults::LLM_URL);
        assert_eq!(config.model, defaults::LLM_MODEL);
        assert_eq!(config.timeout_seconds, defaults::LLM_TIMEOUT_SECS);
        assert!(config.json_mode);
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = OpenAIConfig {
            base_url: "localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let config = OpenAIConfig {
            model: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_creation() {
        let backend = OpenAIChatBackend::new(OpenAIConfig::default()).unwrap();
        assert_eq!(backend.model_name(), defaults::LLM_MODEL);
    }
}
