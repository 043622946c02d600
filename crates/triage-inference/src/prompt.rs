//! Classification prompt template.

use triage_core::Ticket;

/// System message sent with every classification request.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = "You are an IT service desk triage assistant. \
You read support tickets and classify them. You always answer with a single JSON object and nothing else.";

/// Render the classification prompt for a ticket.
///
/// The description is cut to `description_limit` characters.
pub fn classification_prompt(ticket: &Ticket, description_limit: usize) -> String {
    let description = if ticket.description.trim().is_empty() {
        "(no description)".to_string()
    } else {
        truncate_chars(ticket.description.trim(), description_limit)
    };
    let reporter = match (&ticket.reporter_name, &ticket.reporter_email) {
        (Some(name), Some(email)) => format!("{} <{}>", name, email),
        (Some(name), None) => name.clone(),
        (None, Some(email)) => email.clone(),
        (None, None) => "unknown".to_string(),
    };
    let created = ticket
        .created_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        r#"Classify the following support ticket.

Ticket: {key}
Reporter: {reporter}
Created: {created}
Summary: {summary}
Description:
{description}

Respond with a JSON object with exactly these keys:
- "category": top-level area, e.g. "Network", "Hardware", "Software", "Access", "Security"
- "subCategory": specific area within the category, e.g. "VPN", "Printer", "Email", "Password Reset"
- "priority": one of "Highest", "High", "Medium", "Low", "Lowest"
- "urgency": one of "Urgent", "Normal"
- "confidence": integer from 0 to 100
- "reasoning": one or two sentences explaining the classification
- "tags": array of short lowercase keywords (may be empty)"#,
        key = ticket.key,
        reporter = reporter,
        created = created,
        summary = ticket.summary.trim(),
        description = description,
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
