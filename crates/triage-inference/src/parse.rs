//! Parsing of structured classification responses from an LLM.
//!
//! Models wrap JSON in code fences, prepend `<think>` blocks or add a sentence
//! of prose around the object. The parser strips those, takes the outermost
//! `{...}` span and validates the required keys.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use triage_core::{Classification, ClassificationSource, Priority, Urgency};

/// Keys every classification object must carry.
pub const REQUIRED_KEYS: [&str; 6] = [
    "category",
    "subCategory",
    "priority",
    "urgency",
    "confidence",
    "reasoning",
];

/// Why a response could not be turned into a classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty response")]
    Empty,

    #[error("response is not a JSON object: {0}")]
    InvalidJson(String),

    #[error("missing or invalid fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?(</think>|$)").expect("valid regex"))
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json|JSON)?").expect("valid regex"))
}

/// Outermost `{...}` span of a response, if any.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn clean(response: &str) -> String {
    let without_think = think_block().replace_all(response, "");
    code_fence().replace_all(&without_think, "").trim().to_string()
}

/// A parsed LLM answer together with the confidence exactly as the model
/// reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub classification: Classification,
    /// Unverified; may lie outside 0..=100.
    pub reported_confidence: f64,
}

/// Parse an LLM response into an LLM-sourced [`Classification`].
pub fn parse_classification(response: &str) -> Result<Classification, ParseError> {
    parse_response(response).map(|parsed| parsed.classification)
}

/// Parse an LLM response, keeping the raw reported confidence alongside the
/// classification. The stored confidence is clamped into 0..=100.
pub fn parse_response(response: &str) -> Result<ParsedResponse, ParseError> {
    let cleaned = clean(response);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let json = extract_json_object(&cleaned)
        .ok_or_else(|| ParseError::InvalidJson(preview(&cleaned)))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ParseError::InvalidJson("top-level value is not an object".into()));
    };

    let category = non_empty_str(&map, &["category"]);
    let sub_category = non_empty_str(&map, &["subCategory", "sub_category", "subcategory"]);
    let priority = non_empty_str(&map, &["priority"]);
    let urgency = non_empty_str(&map, &["urgency"]);
    let confidence = map.get("confidence").and_then(confidence_value);
    let reasoning = map.get("reasoning").and_then(Value::as_str);

    let present = [
        category.is_some(),
        sub_category.is_some(),
        priority.is_some(),
        urgency.is_some(),
        confidence.is_some(),
        reasoning.is_some(),
    ];
    let invalid: Vec<String> = REQUIRED_KEYS
        .iter()
        .zip(present)
        .filter(|(_, ok)| !ok)
        .map(|(key, _)| key.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(ParseError::MissingFields(invalid));
    }

    let tags = map
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let reported_confidence = confidence.unwrap_or_default();
    let classification = Classification {
        category: category.unwrap_or_default().to_string(),
        sub_category: sub_category.unwrap_or_default().to_string(),
        priority: Priority::from_label(priority.unwrap_or_default()),
        urgency: urgency
            .and_then(|u| u.parse::<Urgency>().ok())
            .unwrap_or_default(),
        confidence: reported_confidence.round().clamp(0.0, 100.0) as u8,
        reasoning: reasoning.unwrap_or_default().trim().to_string(),
        tags,
        source: ClassificationSource::Llm,
    };
    Ok(ParsedResponse {
        classification,
        reported_confidence,
    })
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Accept numbers or numeric strings on the 0..100 scale, unclamped.
fn confidence_value(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then_some(raw)
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "category": "Network",
        "subCategory": "VPN",
        "priority": "High",
        "urgency": "Urgent",
        "confidence": 87,
        "reasoning": "User cannot reach the VPN gateway.",
        "tags": ["vpn", "Remote"]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let c = parse_classification(VALID).unwrap();
        assert_eq!(c.category, "Network");
        assert_eq!(c.sub_category, "VPN");
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.urgency, Urgency::Urgent);
        assert_eq!(c.confidence, 87);
        assert_eq!(c.tags, vec!["vpn", "remote"]);
        assert_eq!(c.source, ClassificationSource::Llm);
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let response = format!("Here is the result:\n```json\n{}\n```\nLet me know!", VALID);
        let c = parse_classification(&response).unwrap();
        assert_eq!(c.sub_category, "VPN");
    }

    #[test]
    fn test_parse_strips_think_block() {
        let response = format!("<think>maybe {{ not json }}</think>{}", VALID);
        let c = parse_classification(&response).unwrap();
        assert_eq!(c.category, "Network");
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(parse_classification("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_classification("<think>only thoughts"),
            Err(ParseError::Empty)
        );
    }

    #[test]
    fn test_prose_without_json() {
        let err = parse_classification("This looks like a network problem.").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_broken_json() {
        let err = parse_classification(r#"{"category": "Network", }"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let err = parse_classification(
            r#"{"category": "Network", "subCategory": "VPN", "priority": "High", "confidence": 50}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingFields(vec!["urgency".to_string(), "reasoning".to_string()])
        );
    }

    #[test]
    fn test_empty_category_counts_as_missing() {
        let json = VALID.replace("\"Network\"", "\"  \"");
        let err = parse_classification(&json).unwrap_err();
        assert_eq!(err, ParseError::MissingFields(vec!["category".to_string()]));
    }

    #[test]
    fn test_non_numeric_confidence_is_invalid() {
        let json = VALID.replace("87", "\"very\"");
        let err = parse_classification(&json).unwrap_err();
        assert_eq!(err, ParseError::MissingFields(vec!["confidence".to_string()]));
    }

    #[test]
    fn test_confidence_value_is_raw() {
        assert_eq!(confidence_value(&serde_json::json!(150)), Some(150.0));
        assert_eq!(confidence_value(&serde_json::json!(-5)), Some(-5.0));
        assert_eq!(confidence_value(&serde_json::json!(0.85)), Some(0.85));
        assert_eq!(confidence_value(&serde_json::json!("72%")), Some(72.0));
        assert_eq!(confidence_value(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_out_of_range_confidence_kept_raw_and_clamped_for_storage() {
        let parsed = parse_response(&VALID.replace("87", "150")).unwrap();
        assert_eq!(parsed.reported_confidence, 150.0);
        assert_eq!(parsed.classification.confidence, 100);

        let parsed = parse_response(&VALID.replace("87", "-10")).unwrap();
        assert_eq!(parsed.reported_confidence, -10.0);
        assert_eq!(parsed.classification.confidence, 0);
    }

    #[test]
    fn test_fractional_confidence_is_not_rescaled() {
        assert_eq!(
            parse_classification(&VALID.replace("87", "0.99")).unwrap().confidence,
            1
        );
        assert_eq!(
            parse_classification(&VALID.replace("87", "1.0")).unwrap().confidence,
            1
        );
    }

    #[test]
    fn test_unknown_priority_maps_to_medium() {
        let json = VALID.replace("\"High\"", "\"P1\"");
        let c = parse_classification(&json).unwrap();
        assert_eq!(c.priority, Priority::Medium);
    }

    #[test]
    fn test_snake_case_sub_category_accepted() {
        let json = VALID.replace("subCategory", "sub_category");
        assert_eq!(parse_classification(&json).unwrap().sub_category, "VPN");
    }
}
