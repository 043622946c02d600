//! Write a triage result back to the ticket store.
//!
//! Fields, assignment and the summary comment are written independently; a
//! failed write is recorded in the [`ApplyReport`] and the remaining writes
//! still run.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::{info, instrument, warn};

use triage_core::labels::merge_classification_labels;
use triage_core::{Priority, Ticket, TicketStore, TicketUpdate, TriageResult};

/// Number of similar tickets listed in the summary comment.
const COMMENT_SIMILAR_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStep {
    Fields,
    Assignee,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyFailure {
    pub step: ApplyStep,
    pub error: String,
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub issue_key: String,
    pub labels: Vec<String>,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub comment_added: bool,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Human-readable summary posted as a ticket comment.
pub fn render_comment(result: &TriageResult) -> String {
    let c = &result.classification;
    let mut out = String::new();
    let _ = writeln!(out, "AI triage ({})", c.source.as_str());
    let _ = writeln!(out, "Category: {} / {}", c.category, c.sub_category);
    let _ = writeln!(out, "Priority: {}", c.priority);
    let _ = writeln!(out, "Urgency: {}", c.urgency);
    let _ = writeln!(out, "Confidence: {}%", c.confidence);
    if !c.reasoning.is_empty() {
        let _ = writeln!(out, "Reasoning: {}", c.reasoning);
    }
    if let Some(rec) = &result.recommendation {
        let _ = writeln!(
            out,
            "Recommended assignee: {} ({})",
            rec.agent.agent.display_name, rec.reason
        );
    }
    if !result.similar_tickets.is_empty() {
        let _ = writeln!(out, "Similar resolved tickets:");
        for similar in result.similar_tickets.iter().take(COMMENT_SIMILAR_LIMIT) {
            let _ = writeln!(
                out,
                "- {}: {} (match {}%)",
                similar.key, similar.summary, similar.similarity_score
            );
        }
    }
    out.trim_end().to_string()
}

/// Apply labels, priority, assignee and a summary comment.
#[instrument(skip(store, ticket, result), fields(
    subsystem = "jira",
    component = "apply",
    op = "apply",
    issue_key = %ticket.key,
))]
pub async fn apply_triage(
    store: &dyn TicketStore,
    ticket: &Ticket,
    result: &TriageResult,
) -> ApplyReport {
    let c = &result.classification;
    let labels = merge_classification_labels(&ticket.labels, &c.category, &c.sub_category);
    let mut report = ApplyReport {
        issue_key: ticket.key.clone(),
        labels: labels.clone(),
        priority: c.priority,
        assigned_to: None,
        comment_added: false,
        failures: Vec::new(),
    };

    let update = TicketUpdate {
        labels: Some(labels),
        priority: Some(c.priority),
    };
    if let Err(e) = store.update_ticket(&ticket.key, &update).await {
        warn!(error = %e, "Failed to update ticket fields");
        report.failures.push(ApplyFailure {
            step: ApplyStep::Fields,
            error: e.to_string(),
        });
    }

    if let Some(rec) = &result.recommendation {
        let account_id = &rec.agent.agent.account_id;
        match store.assign_ticket(&ticket.key, account_id).await {
            Ok(()) => report.assigned_to = Some(account_id.clone()),
            Err(e) => {
                warn!(error = %e, account_id = %account_id, "Failed to assign ticket");
                report.failures.push(ApplyFailure {
                    step: ApplyStep::Assignee,
                    error: e.to_string(),
                });
            }
        }
    }

    match store.add_comment(&ticket.key, &render_comment(result)).await {
        Ok(()) => report.comment_added = true,
        Err(e) => {
            warn!(error = %e, "Failed to add triage comment");
            report.failures.push(ApplyFailure {
                step: ApplyStep::Comment,
                error: e.to_string(),
            });
        }
    }

    info!(
        failures = report.failures.len(),
        assigned = report.assigned_to.is_some(),
        "Triage applied"
    );
    report
}
