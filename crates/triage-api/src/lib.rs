//! # triage-api
//!
//! HTTP surface for the ticket triage assistant: the [`TriageService`] that
//! ties the ticket store, classification chain and settings together, and the
//! axum router exposing it.

pub mod config;
pub mod error;
pub mod routes;
pub mod service;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{router, AppState, ACCOUNT_HEADER};
pub use service::{
    ApplyOutcome, ApplyRequest, ClassificationOverride, ClassifyResponse, IssueKey,
    RequestContext, TriageService,
};
