//! Keyword-overlap similarity between a ticket and resolved candidates.

use std::time::Instant;

use tracing::{debug, instrument, trace};

use triage_core::defaults;
use triage_core::{Error, Result, SimilarTicket, Ticket, TicketStore};

use crate::jql;
use crate::keywords::{extract_keywords, unescape_jql_string};

/// Tunables for similar-ticket search.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    pub min_keyword_len: usize,
    pub max_keywords: usize,
    /// Candidates requested from the store before scoring.
    pub search_limit: u32,
    /// Candidates kept after scoring.
    pub top_n: usize,
    pub excerpt_length: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_keyword_len: defaults::MIN_KEYWORD_LEN,
            max_keywords: defaults::MAX_KEYWORDS,
            search_limit: defaults::SIMILAR_SEARCH_LIMIT,
            top_n: defaults::SIMILAR_TOP_N,
            excerpt_length: defaults::EXCERPT_LENGTH,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl SimilarityConfig {
    /// Read `TRIAGE_MIN_KEYWORD_LEN`, `TRIAGE_MAX_KEYWORDS`,
    /// `TRIAGE_SIMILAR_SEARCH_LIMIT` and `TRIAGE_SIMILAR_TOP_N`.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            min_keyword_len: env_parse("TRIAGE_MIN_KEYWORD_LEN").unwrap_or(base.min_keyword_len),
            max_keywords: env_parse("TRIAGE_MAX_KEYWORDS").unwrap_or(base.max_keywords),
            search_limit: env_parse("TRIAGE_SIMILAR_SEARCH_LIMIT").unwrap_or(base.search_limit),
            top_n: env_parse("TRIAGE_SIMILAR_TOP_N").unwrap_or(base.top_n),
            excerpt_length: base.excerpt_length,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_keywords == 0 {
            return Err(Error::Config("max keywords must be positive".to_string()));
        }
        if self.search_limit == 0 || self.top_n == 0 {
            return Err(Error::Config(
                "similar search limit and top N must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lower-cased text of a candidate ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateText {
    pub summary_lower: String,
    pub description_lower: String,
}

impl CandidateText {
    pub fn new(summary: &str, description: &str) -> Self {
        Self {
            summary_lower: summary.to_lowercase(),
            description_lower: description.to_lowercase(),
        }
    }

    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self::new(&ticket.summary, &ticket.description)
    }
}

/// Percentage of keywords found in the candidate's summary or description.
///
/// Matching is case-insensitive substring containment. Keywords are expected
/// in the escaped form produced by the extractor. An empty keyword set scores 0.
pub fn score(keywords: &[String], candidate: &CandidateText) -> u8 {
    if keywords.is_empty() {
        return 0;
    }
    let matches = keywords
        .iter()
        .filter(|kw| {
            let needle = unescape_jql_string(kw).to_lowercase();
            candidate.summary_lower.contains(&needle)
                || candidate.description_lower.contains(&needle)
        })
        .count();
    ((matches as f64 / keywords.len() as f64) * 100.0).round() as u8
}

/// Score candidates, order by score descending (ties keep input order) and
/// keep the best `top_n`. Candidates that match no keyword are dropped.
pub fn rank_similar(
    keywords: &[String],
    candidates: Vec<Ticket>,
    top_n: usize,
    excerpt_length: usize,
) -> Vec<SimilarTicket> {
    let mut scored: Vec<SimilarTicket> = candidates
        .into_iter()
        .filter_map(|ticket| {
            let similarity_score = score(keywords, &CandidateText::from_ticket(&ticket));
            trace!(issue_key = %ticket.key, similarity_score, "Scored candidate");
            if similarity_score == 0 {
                return None;
            }
            Some(SimilarTicket {
                description_excerpt: excerpt(&ticket.description, excerpt_length),
                key: ticket.key,
                summary: ticket.summary,
                resolution: ticket.resolution,
                resolution_date: ticket.resolution_date,
                assignee: ticket.assignee,
                status: ticket.status,
                similarity_score,
            })
        })
        .collect();

    // sort_by is stable, so equal scores keep the store's ordering.
    scored.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
    scored.truncate(top_n);
    scored
}

/// Find resolved tickets similar to `ticket`.
///
/// Returns an empty list without querying the store when the summary yields
/// no keywords or the ticket key carries no project.
#[instrument(skip(store, ticket, config), fields(
    subsystem = "search",
    component = "similarity",
    op = "find_similar",
    issue_key = %ticket.key,
))]
pub async fn find_similar(
    store: &dyn TicketStore,
    ticket: &Ticket,
    config: &SimilarityConfig,
) -> Result<Vec<SimilarTicket>> {
    let start = Instant::now();
    let keywords = extract_keywords(&ticket.summary, config.min_keyword_len, config.max_keywords);

    let Some(project_key) = ticket.project_key() else {
        debug!("Ticket key has no project prefix, skipping similarity search");
        return Ok(Vec::new());
    };

    let Some(query) = jql::resolved_matching(project_key, &ticket.key, &keywords) else {
        debug!(keyword_count = 0, "No qualifying keywords, skipping similarity search");
        return Ok(Vec::new());
    };

    debug!(keyword_count = keywords.len(), jql = %query, "Searching resolved tickets");
    let candidates = store.search_tickets(&query, config.search_limit).await?;
    let candidate_count = candidates.len();
    let similar = rank_similar(&keywords, candidates, config.top_n, config.excerpt_length);

    debug!(
        candidate_count,
        result_count = similar.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Similarity search complete"
    );
    Ok(similar)
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", trimmed[..idx].trim_end()),
        None => trimmed.to_string(),
    }
}
