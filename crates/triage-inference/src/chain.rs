//! Classification fallback chain.
//!
//! `TryLLM -> TryKeywordHeuristic -> UseStaticDefault`. Every ticket gets a
//! classification; errors from the LLM step are converted into a
//! [`FallbackReason`] and never propagated.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use triage_core::defaults;
use triage_core::{ChatBackend, ChatRequest, Classification, Error, Result, Ticket};

use crate::heuristic::classify_by_keywords;
use crate::metrics::MetricsTracker;
use crate::parse::{parse_response, ParseError, ParsedResponse};
use crate::prompt::{classification_prompt, CLASSIFICATION_SYSTEM_PROMPT};

/// Why the chain left the LLM step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// The backend could not be reached.
    NetworkError,
    /// The backend answered with an error status or an unusable body.
    LlmError,
    Timeout,
    EmptyResponse,
    InvalidJson,
    MissingFields,
    /// The LLM step is switched off.
    LlmDisabled,
}

impl FallbackReason {
    /// Kebab-case tag used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NetworkError => "network-error",
            FallbackReason::LlmError => "llm-error",
            FallbackReason::Timeout => "timeout",
            FallbackReason::EmptyResponse => "empty-response",
            FallbackReason::InvalidJson => "invalid-json",
            FallbackReason::MissingFields => "missing-fields",
            FallbackReason::LlmDisabled => "llm-disabled",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Error> for FallbackReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::Request(_) => FallbackReason::NetworkError,
            Error::Timeout(_) => FallbackReason::Timeout,
            _ => FallbackReason::LlmError,
        }
    }
}

impl From<&ParseError> for FallbackReason {
    fn from(err: &ParseError) -> Self {
        match err {
            ParseError::Empty => FallbackReason::EmptyResponse,
            ParseError::InvalidJson(_) => FallbackReason::InvalidJson,
            ParseError::MissingFields(_) => FallbackReason::MissingFields,
        }
    }
}

/// Chain settings.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Model requested from the backend. Empty means the backend default.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for the whole LLM step. `None` disables it.
    pub timeout: Option<Duration>,
    pub llm_enabled: bool,
    /// When false, LLM failures go straight to the static default.
    pub heuristic_enabled: bool,
    /// Description characters included in the prompt.
    pub description_limit: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: defaults::LLM_TEMPERATURE,
            max_tokens: defaults::LLM_MAX_TOKENS,
            timeout: Some(Duration::from_secs(defaults::CLASSIFY_TIMEOUT_SECS)),
            llm_enabled: true,
            heuristic_enabled: true,
            description_limit: defaults::PROMPT_DESCRIPTION_LIMIT,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ChainConfig {
    /// Read chain settings from the environment.
    ///
    /// `TRIAGE_CLASSIFY_TIMEOUT_SECS=0` disables the deadline.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            model: std::env::var("LLM_MODEL").unwrap_or(base.model),
            temperature: env_parse("LLM_TEMPERATURE").unwrap_or(base.temperature),
            max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(base.max_tokens),
            timeout: match env_parse::<u64>("TRIAGE_CLASSIFY_TIMEOUT_SECS") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => base.timeout,
            },
            llm_enabled: env_flag("LLM_ENABLED", base.llm_enabled),
            heuristic_enabled: env_flag("TRIAGE_HEURISTIC_ENABLED", base.heuristic_enabled),
            description_limit: base.description_limit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "LLM temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("LLM max tokens must be positive".to_string()));
        }
        Ok(())
    }
}

/// Result of running the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub classification: Classification,
    /// Set whenever the LLM step did not produce the classification.
    pub fallback_reason: Option<FallbackReason>,
}

/// Runs the fallback chain against an injected backend and metrics tracker.
#[derive(Clone)]
pub struct ClassificationChain {
    backend: Arc<dyn ChatBackend>,
    metrics: Arc<MetricsTracker>,
    config: ChainConfig,
}

impl ClassificationChain {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        metrics: Arc<MetricsTracker>,
        config: ChainConfig,
    ) -> Self {
        Self {
            backend,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsTracker> {
        &self.metrics
    }

    /// Classify a ticket. Never fails.
    #[instrument(skip(self, ticket), fields(
        subsystem = "inference",
        component = "fallback_chain",
        op = "classify",
        issue_key = %ticket.key,
    ))]
    pub async fn classify(&self, ticket: &Ticket) -> ChainOutcome {
        let start = Instant::now();

        let reason = if self.config.llm_enabled {
            match self.try_llm(ticket).await {
                Ok(ParsedResponse {
                    classification,
                    reported_confidence,
                }) => {
                    self.metrics.track_success(Some(reported_confidence));
                    info!(
                        source = classification.source.as_str(),
                        confidence = classification.confidence,
                        reported_confidence,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Classification complete"
                    );
                    return ChainOutcome {
                        classification,
                        fallback_reason: None,
                    };
                }
                Err(reason) => {
                    self.metrics.track_failure();
                    reason
                }
            }
        } else {
            FallbackReason::LlmDisabled
        };
        self.metrics.track_fallback(reason.as_str());

        let classification = if self.config.heuristic_enabled {
            warn!(
                fallback_reason = reason.as_str(),
                "LLM classification unavailable, using keyword heuristic"
            );
            classify_by_keywords(ticket)
        } else {
            warn!(
                fallback_reason = reason.as_str(),
                "LLM classification unavailable and heuristic disabled, using static default"
            );
            Classification::manual_triage()
        };

        info!(
            source = classification.source.as_str(),
            confidence = classification.confidence,
            fallback_reason = reason.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Classification complete"
        );
        ChainOutcome {
            classification,
            fallback_reason: Some(reason),
        }
    }

    async fn try_llm(&self, ticket: &Ticket) -> std::result::Result<ParsedResponse, FallbackReason> {
        let request = ChatRequest {
            system: Some(CLASSIFICATION_SYSTEM_PROMPT.to_string()),
            prompt: classification_prompt(ticket, self.config.description_limit),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        debug!(
            model = %self.backend.model_name(),
            prompt_len = request.prompt.len(),
            "Requesting LLM classification"
        );

        let call = self.backend.complete(&request);
        let result = match self.config.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = deadline.as_millis() as u64, "LLM call timed out");
                    return Err(FallbackReason::Timeout);
                }
            },
            None => call.await,
        };

        let completion = result.map_err(|e| {
            let reason = FallbackReason::from(&e);
            warn!(error = %e, fallback_reason = reason.as_str(), "LLM call failed");
            reason
        })?;

        debug!(response_len = completion.text.len(), "LLM responded");
        parse_response(&completion.text).map_err(|e| {
            let reason = FallbackReason::from(&e);
            warn!(error = %e, fallback_reason = reason.as_str(), "LLM response rejected");
            reason
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChatBackend, MockReply};
    use triage_core::{ClassificationSource, Priority, Urgency};

    const VALID: &str = r#"{"category":"Network","subCategory":"VPN","priority":"High",
        "urgency":"Urgent","confidence":88,"reasoning":"VPN gateway unreachable","tags":["vpn"]}"#;

    fn ticket() -> Ticket {
        Ticket {
            key: "IT-7".to_string(),
            summary: "Cannot connect to VPN from home".to_string(),
            description: "Client says gateway unreachable".to_string(),
            ..Default::default()
        }
    }

    fn build_chain(
        backend: MockChatBackend,
        config: ChainConfig,
    ) -> (ClassificationChain, Arc<MetricsTracker>) {
        let metrics = Arc::new(MetricsTracker::new());
        (
            ClassificationChain::new(Arc::new(backend), metrics.clone(), config),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_llm_success() {
        let (chain, metrics) = build_chain(
            MockChatBackend::new().with_reply(MockReply::text(VALID)),
            ChainConfig::default(),
        );
        let outcome = chain.classify(&ticket()).await;

        assert_eq!(outcome.fallback_reason, None);
        let c = outcome.classification;
        assert_eq!(c.source, ClassificationSource::Llm);
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.urgency, Urgency::Urgent);
        assert_eq!(c.confidence, 88);

        let snap = metrics.snapshot();
        assert_eq!(snap.rovo_calls.successful, 1);
        assert_eq!(snap.confidence_scores.sum, 88.0);
        assert_eq!(snap.fallback_usage.total, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_llm_confidence_not_recorded() {
        for (reported, stored) in [("150", 100), ("-10", 0)] {
            let (chain, metrics) = build_chain(
                MockChatBackend::new().with_reply(MockReply::text(&VALID.replace("88", reported))),
                ChainConfig::default(),
            );
            let outcome = chain.classify(&ticket()).await;
            assert_eq!(outcome.fallback_reason, None);
            assert_eq!(outcome.classification.confidence, stored);

            let snap = metrics.snapshot();
            assert_eq!(snap.rovo_calls.successful, 1);
            assert_eq!(snap.confidence_scores.count, 0);
            assert_eq!(snap.confidence_scores.sum, 0.0);
        }
    }

    #[tokio::test]
    async fn test_network_error_falls_back_to_keywords() {
        let (chain, metrics) = build_chain(
            MockChatBackend::new().with_reply(MockReply::network_error()),
            ChainConfig::default(),
        );
        let outcome = chain.classify(&ticket()).await;

        assert_eq!(outcome.fallback_reason, Some(FallbackReason::NetworkError));
        assert_eq!(
            outcome.classification.source,
            ClassificationSource::KeywordFallback
        );
        assert_eq!(outcome.classification.sub_category, "VPN");

        let snap = metrics.snapshot();
        assert_eq!(snap.rovo_calls.failed, 1);
        assert_eq!(snap.fallback_usage.reasons["network-error"], 1);
    }

    #[tokio::test]
    async fn test_heuristic_disabled_uses_static_default() {
        let config = ChainConfig {
            heuristic_enabled: false,
            ..Default::default()
        };
        let (chain, _) = build_chain(
            MockChatBackend::new().with_reply(MockReply::Status(500)),
            config,
        );
        let outcome = chain.classify(&ticket()).await;

        assert_eq!(outcome.fallback_reason, Some(FallbackReason::LlmError));
        assert_eq!(outcome.classification, Classification::manual_triage());
        assert_eq!(outcome.classification.confidence, 0);
        assert_eq!(outcome.classification.source, ClassificationSource::Default);
    }

    #[tokio::test]
    async fn test_parse_failures_map_to_reasons() {
        let cases = [
            ("", FallbackReason::EmptyResponse),
            ("It is probably the network.", FallbackReason::InvalidJson),
            (r#"{"category":"Network"}"#, FallbackReason::MissingFields),
        ];
        for (reply, expected) in cases {
            let (chain, metrics) = build_chain(
                MockChatBackend::new().with_reply(MockReply::text(reply)),
                ChainConfig::default(),
            );
            let outcome = chain.classify(&ticket()).await;
            assert_eq!(outcome.fallback_reason, Some(expected), "reply {:?}", reply);
            assert_eq!(metrics.snapshot().fallback_usage.reasons[expected.as_str()], 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let config = ChainConfig {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let (chain, metrics) = build_chain(
            MockChatBackend::new()
                .with_latency(Duration::from_secs(120))
                .with_reply(MockReply::text(VALID)),
            config,
        );
        let outcome = chain.classify(&ticket()).await;

        assert_eq!(outcome.fallback_reason, Some(FallbackReason::Timeout));
        assert_eq!(
            outcome.classification.source,
            ClassificationSource::KeywordFallback
        );
        assert_eq!(metrics.snapshot().fallback_usage.reasons["timeout"], 1);
    }

    #[tokio::test]
    async fn test_llm_disabled_skips_backend() {
        let backend = MockChatBackend::new().with_default_reply(MockReply::text(VALID));
        let config = ChainConfig {
            llm_enabled: false,
            ..Default::default()
        };
        let (chain, metrics) = build_chain(backend.clone(), config);
        let outcome = chain.classify(&ticket()).await;

        assert_eq!(outcome.fallback_reason, Some(FallbackReason::LlmDisabled));
        assert_eq!(backend.call_count(), 0);
        let snap = metrics.snapshot();
        assert_eq!(snap.rovo_calls.total, 0);
        assert_eq!(snap.fallback_usage.reasons["llm-disabled"], 1);
    }

    #[tokio::test]
    async fn test_request_carries_config() {
        let backend = MockChatBackend::new().with_default_reply(MockReply::text(VALID));
        let config = ChainConfig {
            model: "gpt-test".to_string(),
            temperature: 0.1,
            max_tokens: 123,
            ..Default::default()
        };
        let (chain, _) = build_chain(backend.clone(), config);
        chain.classify(&ticket()).await;

        let calls = backend.get_calls();
        assert_eq!(calls.len(), 1);
        let request = &calls[0].request;
        assert_eq!(request.model, "gpt-test");
        assert_eq!(request.temperature, 0.1);
        assert_eq!(request.max_tokens, 123);
        assert!(request.prompt.contains("IT-7"));
        assert!(request.system.is_some());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let config = ChainConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(ChainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reason_tags() {
        assert_eq!(FallbackReason::NetworkError.to_string(), "network-error");
        assert_eq!(
            FallbackReason::from(&Error::Timeout("x".into())),
            FallbackReason::Timeout
        );
        assert_eq!(
            FallbackReason::from(&Error::Upstream("x".into())),
            FallbackReason::LlmError
        );
    }
}
