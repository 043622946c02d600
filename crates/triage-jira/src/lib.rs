//! # triage-jira
//!
//! Ticket store implementations for the triage assistant.
//!
//! This crate provides:
//! - [`JiraClient`], a Jira Cloud REST v3 client with Basic auth
//! - In-memory ticket and settings stores for tests and offline runs
//! - A JQL subset evaluator backing the in-memory store
//! - The apply step that writes a triage result back to a ticket
//!
//! ## Example
//!
//! ```rust,ignore
//! use triage_core::TicketStore;
//! use triage_jira::JiraClient;
//!
//! #[tokio::main]
//! async fn main() -> triage_core::Result<()> {
//!     let jira = JiraClient::from_env()?;
//!     let ticket = jira.get_ticket("IT-42").await?;
//!     println!("{}", ticket.summary);
//!     Ok(())
//! }
//! ```

pub mod adf;
pub mod apply;
pub mod client;
pub mod config;
pub mod jql;
pub mod memory;
pub mod types;

pub use apply::{apply_triage, render_comment, ApplyFailure, ApplyReport, ApplyStep};
pub use client::JiraClient;
pub use config::JiraConfig;
pub use memory::{MemorySettingsStore, MemoryTicketStore};
