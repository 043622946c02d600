//! Structured logging field name constants.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation can query by the same names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (candidate scores, agent loads) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "inference", "jira"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "fallback_chain", "workload", "similarity", "metrics"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "classify", "rank_agents", "find_similar", "apply"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Ticket key being operated on.
pub const ISSUE_KEY: &str = "issue_key";

/// Project key scoping a query.
pub const PROJECT_KEY: &str = "project_key";

/// Agent account identifier.
pub const ACCOUNT_ID: &str = "account_id";

/// JQL query text.
pub const JQL: &str = "jql";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of keywords extracted.
pub const KEYWORD_COUNT: &str = "keyword_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Classification fields ─────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Classification source ("llm", "keyword-fallback", "default", "manual").
pub const SOURCE: &str = "source";

/// Reason tag recorded when leaving the LLM step.
pub const FALLBACK_REASON: &str = "fallback_reason";

/// Reported confidence.
pub const CONFIDENCE: &str = "confidence";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
