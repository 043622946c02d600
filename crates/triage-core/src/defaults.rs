//! Centralized default constants for the triage assistant.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.

// =============================================================================
// KEYWORDS & SIMILARITY
// =============================================================================

/// Tokens need at least this many characters to become keywords.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Maximum number of keywords extracted from a ticket summary.
pub const MAX_KEYWORDS: usize = 5;

/// Number of resolved tickets requested from the store for similarity scoring.
pub const SIMILAR_SEARCH_LIMIT: u32 = 20;

/// Number of similar tickets returned after scoring.
pub const SIMILAR_TOP_N: usize = 3;

/// Characters of description kept in a similar-ticket excerpt.
pub const EXCERPT_LENGTH: usize = 200;

// =============================================================================
// WORKLOAD
// =============================================================================

/// Maximum assignable users fetched per project.
pub const AGENT_LIMIT: u32 = 50;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Confidence reported by the keyword heuristic classifier.
pub const HEURISTIC_CONFIDENCE: u8 = 60;

/// Sampling temperature for classification prompts.
pub const LLM_TEMPERATURE: f32 = 0.3;

/// Completion token ceiling for classification prompts.
pub const LLM_MAX_TOKENS: u32 = 500;

/// Default chat model.
pub const LLM_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible endpoint.
pub const LLM_URL: &str = "https://api.openai.com/v1";

/// HTTP timeout for a single LLM request, in seconds.
pub const LLM_TIMEOUT_SECS: u64 = 60;

/// Deadline for the LLM step of the classification chain, in seconds.
pub const CLASSIFY_TIMEOUT_SECS: u64 = 30;

/// Characters of ticket description included in a prompt.
pub const PROMPT_DESCRIPTION_LIMIT: usize = 2000;

// =============================================================================
// JIRA
// =============================================================================

/// HTTP timeout for Jira requests, in seconds.
pub const JIRA_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// METRICS
// =============================================================================

/// Interval between opportunistic metrics summaries, in seconds.
pub const METRICS_LOG_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// SETTINGS
// =============================================================================

/// Settings key holding the auto-triage on/off flag.
pub const AUTO_TRIAGE_SETTING: &str = "auto-triage-enabled";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;
