//! JQL query builders.
//!
//! Every value interpolated into a query goes through
//! [`escape_jql_string`](crate::keywords::escape_jql_string) and is quoted,
//! except keywords which arrive pre-escaped from the extractor.

use crate::keywords::escape_jql_string;

fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_jql_string(value))
}

/// Open tickets in `project_key` assigned to `account_id`.
pub fn open_assigned(project_key: &str, account_id: &str) -> String {
    format!(
        "project = {} AND assignee = {} AND statusCategory != Done",
        quoted(project_key),
        quoted(account_id)
    )
}

/// Resolved tickets in `project_key` mentioning any of `escaped_keywords`,
/// excluding `exclude_key`, newest resolution first.
///
/// Returns `None` for an empty keyword set so callers cannot issue an
/// unbounded search by accident.
pub fn resolved_matching(
    project_key: &str,
    exclude_key: &str,
    escaped_keywords: &[String],
) -> Option<String> {
    if escaped_keywords.is_empty() {
        return None;
    }
    let text_clause = escaped_keywords
        .iter()
        .map(|kw| format!("text ~ \"{}\"", kw))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!(
        "project = {} AND key != {} AND statusCategory = Done AND ({}) ORDER BY resolutiondate DESC",
        quoted(project_key),
        quoted(exclude_key),
        text_clause
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_assigned() {
        assert_eq!(
            open_assigned("IT", "acc-1"),
            r#"project = "IT" AND assignee = "acc-1" AND statusCategory != Done"#
        );
    }

    #[test]
    fn test_open_assigned_escapes_values() {
        let jql = open_assigned("IT", r#"x" OR 1=1 OR "y"#);
        assert!(jql.contains(r#"assignee = "x\" OR 1=1 OR \"y""#));
    }

    #[test]
    fn test_resolved_matching() {
        let kws = vec!["VPN".to_string(), "home".to_string()];
        assert_eq!(
            resolved_matching("IT", "IT-9", &kws).unwrap(),
            r#"project = "IT" AND key != "IT-9" AND statusCategory = Done AND (text ~ "VPN" OR text ~ "home") ORDER BY resolutiondate DESC"#
        );
    }

    #[test]
    fn test_resolved_matching_empty_keywords() {
        assert!(resolved_matching("IT", "IT-9", &[]).is_none());
    }
}
