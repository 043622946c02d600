//! Atlassian Document Format (ADF) conversion.
//!
//! Jira Cloud v3 returns rich-text fields as ADF trees and expects comments
//! in the same format. Only plain text is needed here.

use serde_json::{json, Value};

const BLOCK_NODES: &[&str] = &[
    "paragraph",
    "heading",
    "blockquote",
    "codeBlock",
    "listItem",
    "tableRow",
    "panel",
    "rule",
];

/// Flatten an ADF document (or a plain string) to text.
///
/// Block nodes end with a newline; runs of blank lines are collapsed.
pub fn to_plain_text(value: &Value) -> String {
    let mut out = String::new();
    walk(value, &mut out);

    let mut text = String::with_capacity(out.len());
    let mut blank_run = 0;
    for line in out.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        text.push_str(line);
        text.push('\n');
    }
    text.trim().to_string()
}

fn walk(node: &Value, out: &mut String) {
    match node {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
        Value::Object(map) => {
            let node_type = map.get("type").and_then(Value::as_str).unwrap_or("");
            match node_type {
                "text" => {
                    if let Some(text) = map.get("text").and_then(Value::as_str) {
                        out.push_str(text);
                    }
                }
                "hardBreak" => out.push('\n'),
                "mention" | "emoji" => {
                    if let Some(text) = map
                        .get("attrs")
                        .and_then(|a| a.get("text"))
                        .and_then(Value::as_str)
                    {
                        out.push_str(text);
                    }
                }
                _ => {
                    if let Some(content) = map.get("content") {
                        walk(content, out);
                    }
                    if BLOCK_NODES.contains(&node_type) {
                        out.push('\n');
                    }
                }
            }
        }
        _ => {}
    }
}

/// Build an ADF document from plain text, one paragraph per line.
pub fn from_plain_text(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                json!({ "type": "paragraph", "content": [] })
            } else {
                json!({
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": line }]
                })
            }
        })
        .collect();
    json!({ "type": "doc", "version": 1, "content": paragraphs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_paragraphs_and_lists() {
        let doc = json!({
            "type": "doc",
            "version": 1,
            "content": [
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "VPN drops " },
                    { "type": "text", "text": "every hour", "marks": [{ "type": "strong" }] }
                ]},
                { "type": "bulletList", "content": [
                    { "type": "listItem", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "Windows 11" }] }
                    ]}
                ]},
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "line one" },
                    { "type": "hardBreak" },
                    { "type": "text", "text": "line two" }
                ]}
            ]
        });
        assert_eq!(
            to_plain_text(&doc),
            "VPN drops every hour\nWindows 11\n\nline one\nline two"
        );
    }

    #[test]
    fn test_flatten_plain_string_and_null() {
        assert_eq!(to_plain_text(&json!("  legacy text ")), "legacy text");
        assert_eq!(to_plain_text(&Value::Null), "");
    }

    #[test]
    fn test_mentions_use_display_text() {
        let doc = json!({ "type": "paragraph", "content": [
            { "type": "text", "text": "ping " },
            { "type": "mention", "attrs": { "id": "abc", "text": "@Dana" } }
        ]});
        assert_eq!(to_plain_text(&doc), "ping @Dana");
    }

    #[test]
    fn test_from_plain_text() {
        let doc = from_plain_text("Category: Network\n\nReasoning: VPN");
        assert_eq!(doc["type"], "doc");
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["content"][0]["text"], "Category: Network");
        assert_eq!(to_plain_text(&doc), "Category: Network\n\nReasoning: VPN");
    }
}
