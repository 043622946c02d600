//! Keyword extraction from free text.
//!
//! Keywords are whitespace tokens in their original order and case. No
//! stop-word removal or frequency ranking is applied; the first qualifying
//! tokens win. Each keyword is escaped so it can be embedded in a quoted JQL
//! string literal.

/// Extract up to `max_count` keywords of at least `min_len` characters.
///
/// Returns an empty vector when no token qualifies. That is a normal outcome:
/// callers must treat it as "nothing to search for" rather than an error.
///
/// # Examples
///
/// ```
/// use triage_search::keywords::extract_keywords;
///
/// let kw = extract_keywords("Cannot connect to VPN from home", 3, 5);
/// assert_eq!(kw, vec!["Cannot", "connect", "VPN", "from", "home"]);
///
/// assert!(extract_keywords("a to be", 3, 5).is_empty());
/// ```
pub fn extract_keywords(text: &str, min_len: usize, max_count: usize) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.chars().count() >= min_len)
        .take(max_count)
        .map(escape_jql_string)
        .collect()
}

/// Escape `\` and `"` for use inside a double-quoted JQL literal.
pub fn escape_jql_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverse [`escape_jql_string`].
pub fn unescape_jql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
