//! # triage-inference
//!
//! Ticket classification for the triage assistant.
//!
//! This crate provides:
//! - OpenAI-compatible chat backend (feature `openai`, default)
//! - Classification prompt and tolerant response parsing
//! - Keyword heuristic classifier
//! - The LLM -> heuristic -> static default fallback chain
//! - Process-wide classification metrics
//!
//! # Feature Flags
//!
//! - `openai` (default): Enable the OpenAI-compatible backend
//! - `mock`: Expose [`mock::MockChatBackend`] to other crates' tests

pub mod chain;
pub mod heuristic;
pub mod metrics;
pub mod parse;
pub mod prompt;

#[cfg(feature = "openai")]
pub mod openai;

// Mock chat backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatBackend, OpenAIConfig};

pub use chain::{ChainConfig, ChainOutcome, ClassificationChain, FallbackReason};
pub use heuristic::classify_by_keywords;
pub use metrics::MetricsTracker;
pub use parse::{parse_classification, parse_response, ParseError, ParsedResponse};
pub use prompt::classification_prompt;
