//! Data models for the triage assistant.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// TICKET
// =============================================================================

/// Immutable snapshot of a ticket as fetched from the ticket store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reporter_name: Option<String>,
    #[serde(default)]
    pub reporter_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Display name of the current assignee, if any.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub resolution_date: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Project key prefix of the ticket key (`PROJ` for `PROJ-123`).
    pub fn project_key(&self) -> Option<&str> {
        project_key_of(&self.key)
    }
}

/// Extract the project key from an issue key such as `PROJ-123`.
pub fn project_key_of(issue_key: &str) -> Option<&str> {
    let (project, number) = issue_key.rsplit_once('-')?;
    if project.is_empty() || number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(project)
}

// =============================================================================
// PRIORITY / URGENCY
// =============================================================================

/// Ticket priority label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    #[default]
    Medium,
    Low,
    Lowest,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Highest,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Lowest,
    ];

    /// Parse a priority label leniently; unmapped labels become `Medium`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Jira's built-in priority identifier for this label.
    pub fn jira_id(&self) -> &'static str {
        match self {
            Priority::Highest => "1",
            Priority::High => "2",
            Priority::Medium => "3",
            Priority::Low => "4",
            Priority::Lowest => "5",
        }
    }

    /// Jira priority name used in field updates.
    pub fn jira_name(&self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jira_name())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "highest" | "blocker" => Ok(Priority::Highest),
            "high" | "critical" | "major" => Ok(Priority::High),
            "medium" | "normal" => Ok(Priority::Medium),
            "low" | "minor" => Ok(Priority::Low),
            "lowest" | "trivial" => Ok(Priority::Lowest),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// How soon a ticket needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Urgency {
    Urgent,
    #[default]
    Normal,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Urgent => write!(f, "Urgent"),
            Urgency::Normal => write!(f, "Normal"),
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgent" | "high" | "critical" => Ok(Urgency::Urgent),
            "normal" | "low" | "medium" => Ok(Urgency::Normal),
            other => Err(format!("unknown urgency: {}", other)),
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Which step of the classification chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationSource {
    Llm,
    KeywordFallback,
    Default,
    /// Supplied by an operator when applying a triage result.
    Manual,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Llm => "llm",
            ClassificationSource::KeywordFallback => "keyword-fallback",
            ClassificationSource::Default => "default",
            ClassificationSource::Manual => "manual",
        }
    }
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category, priority and urgency assigned to a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: String,
    pub sub_category: String,
    pub priority: Priority,
    pub urgency: Urgency,
    /// 0..=100. For LLM results this is whatever the model reported.
    pub confidence: u8,
    pub reasoning: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: ClassificationSource,
}

impl Classification {
    /// Result used when no classifier is available.
    pub fn manual_triage() -> Self {
        Self {
            category: "Uncategorized".to_string(),
            sub_category: "General".to_string(),
            priority: Priority::Medium,
            urgency: Urgency::Normal,
            confidence: 0,
            reasoning: "manual triage required".to_string(),
            tags: Vec::new(),
            source: ClassificationSource::Default,
        }
    }
}

// =============================================================================
// AGENTS
// =============================================================================

/// A user who can be assigned tickets in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub account_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub active: bool,
}

/// An agent annotated with the number of open tickets currently assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAgent {
    #[serde(flatten)]
    pub agent: Agent,
    pub current_load: u32,
}

/// The agent suggested for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeRecommendation {
    #[serde(flatten)]
    pub agent: RankedAgent,
    pub reason: String,
}

impl AssigneeRecommendation {
    pub fn lowest_workload(agent: RankedAgent) -> Self {
        let reason = format!("Lowest workload ({} open tickets)", agent.current_load);
        Self { agent, reason }
    }
}

// =============================================================================
// SIMILAR TICKETS
// =============================================================================

/// A previously resolved ticket textually similar to the one being triaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarTicket {
    pub key: String,
    pub summary: String,
    pub description_excerpt: String,
    pub resolution: Option<String>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    /// Derived 0..=100 keyword overlap score.
    pub similarity_score: u8,
}

// =============================================================================
// TRIAGE RESULT / WRITE-BACK
// =============================================================================

/// Merged output of classification, assignee ranking and similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub issue_key: String,
    pub classification: Classification,
    pub recommendation: Option<AssigneeRecommendation>,
    #[serde(default)]
    pub ranked_agents: Vec<RankedAgent>,
    #[serde(default)]
    pub similar_tickets: Vec<SimilarTicket>,
    /// Reason tag recorded when the LLM step was abandoned.
    #[serde(default)]
    pub fallback_reason: Option<String>,
}

/// Fields written back to a ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.labels.is_none() && self.priority.is_none()
    }
}

// =============================================================================
// METRICS
// =============================================================================

/// LLM call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCounters {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Fallback counters keyed by reason tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCounters {
    pub total: u64,
    pub reasons: BTreeMap<String, u64>,
}

/// Running confidence sum for averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub sum: f64,
    pub count: u64,
}

/// Point-in-time copy of the process-wide classification counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub rovo_calls: CallCounters,
    pub fallback_usage: FallbackCounters,
    pub confidence_scores: ConfidenceScores,
    pub last_reset: DateTime<Utc>,
    pub success_rate: f64,
    pub fallback_rate: f64,
    pub average_confidence: f64,
}
