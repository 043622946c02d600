//! # triage-search
//!
//! Keyword extraction, keyword-overlap similarity and workload ranking for
//! the ticket triage assistant.
//!
//! Everything here is either pure or talks to the ticket store only through
//! the [`TicketStore`](triage_core::TicketStore) trait.

pub mod jql;
pub mod keywords;
pub mod similarity;
pub mod workload;

pub use keywords::{escape_jql_string, extract_keywords};
pub use similarity::{find_similar, rank_similar, score, CandidateText, SimilarityConfig};
pub use workload::{rank_agents, rank_agents_with_store, AgentRanking};
