//! Keyword heuristic classifier.
//!
//! A static rule table checked in order against the lower-cased summary and
//! description. Keywords and escalation tokens match whole words, and a
//! multi-word keyword must appear as a contiguous run, so "docker" is not
//! "dock". The first rule with a matching keyword decides the category.
//! This classifier never fails; unmatched tickets land in `General/Other`.

use triage_core::defaults::HEURISTIC_CONFIDENCE;
use triage_core::{Classification, ClassificationSource, Priority, Ticket, Urgency};

/// One row of the heuristic lookup table.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub category: &'static str,
    pub sub_category: &'static str,
    pub priority: Priority,
}

/// Lookup table, most specific rules first.
pub const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["phishing", "malware", "virus", "ransomware", "suspicious"],
        category: "Security",
        sub_category: "Threat",
        priority: Priority::High,
    },
    KeywordRule {
        keywords: &["vpn", "anyconnect", "globalprotect"],
        category: "Network",
        sub_category: "VPN",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["wifi", "wi-fi", "wireless"],
        category: "Network",
        sub_category: "WiFi",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["network", "internet", "connectivity", "dns", "ethernet"],
        category: "Network",
        sub_category: "Connectivity",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["printer", "printing", "scanner", "toner"],
        category: "Hardware",
        sub_category: "Printer",
        priority: Priority::Low,
    },
    KeywordRule {
        keywords: &["laptop", "battery", "screen", "boot"],
        category: "Hardware",
        sub_category: "Laptop",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["monitor", "keyboard", "mouse", "dock", "headset"],
        category: "Hardware",
        sub_category: "Peripherals",
        priority: Priority::Low,
    },
    KeywordRule {
        keywords: &["password", "locked out", "mfa", "2fa", "authenticator"],
        category: "Access",
        sub_category: "Password Reset",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["permission", "access request", "access to", "grant access"],
        category: "Access",
        sub_category: "Permissions",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["login", "log in", "sign in", "sso"],
        category: "Access",
        sub_category: "Login",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["email", "outlook", "mailbox", "calendar"],
        category: "Software",
        sub_category: "Email",
        priority: Priority::Medium,
    },
    KeywordRule {
        keywords: &["install", "license", "upgrade", "software"],
        category: "Software",
        sub_category: "Installation",
        priority: Priority::Low,
    },
];

/// Words that escalate priority to High and urgency to Urgent.
pub const ESCALATION_TOKENS: &[&str] = &[
    "urgent",
    "critical",
    "down",
    "outage",
    "asap",
    "emergency",
];

/// Classify a ticket from keywords alone.
pub fn classify_by_keywords(ticket: &Ticket) -> Classification {
    let text = format!("{} {}", ticket.summary, ticket.description).to_lowercase();
    let words = words(&text);

    let matched = KEYWORD_RULES.iter().find_map(|rule| {
        rule.keywords
            .iter()
            .find(|kw| contains_phrase(&words, kw))
            .map(|kw| (rule, *kw))
    });

    let escalation = ESCALATION_TOKENS
        .iter()
        .copied()
        .find(|token| words.contains(token));

    let (category, sub_category, base_priority, mut reasoning, mut tags) = match matched {
        Some((rule, keyword)) => (
            rule.category,
            rule.sub_category,
            rule.priority,
            format!("Keyword match on \"{}\".", keyword),
            vec![keyword.to_string()],
        ),
        None => (
            "General",
            "Other",
            Priority::Medium,
            "No category keyword matched.".to_string(),
            Vec::new(),
        ),
    };

    let (priority, urgency) = match escalation {
        Some(token) => {
            reasoning.push_str(&format!(" Escalated on \"{}\".", token));
            tags.push(token.to_string());
            (more_severe(base_priority, Priority::High), Urgency::Urgent)
        }
        None => (base_priority, Urgency::Normal),
    };

    Classification {
        category: category.to_string(),
        sub_category: sub_category.to_string(),
        priority,
        urgency,
        confidence: HEURISTIC_CONFIDENCE,
        reasoning,
        tags,
        source: ClassificationSource::KeywordFallback,
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// True when the words of `phrase` occur consecutively in `words`.
fn contains_phrase(haystack: &[&str], phrase: &str) -> bool {
    let needle = words(phrase);
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

fn rank(priority: Priority) -> u8 {
    match priority {
        Priority::Highest => 5,
        Priority::High => 4,
        Priority::Medium => 3,
        Priority::Low => 2,
        Priority::Lowest => 1,
    }
}

fn more_severe(a: Priority, b: Priority) -> Priority {
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}
