//! Evaluator for the small JQL subset the triage queries use.
//!
//! Grammar:
//!
//! ```text
//! query  := or_expr [ORDER BY field [ASC|DESC]]
//! or_expr  := and_expr (OR and_expr)*
//! and_expr := atom (AND atom)*
//! atom   := '(' or_expr ')' | field op value
//! op     := '=' | '!=' | '~'
//! value  := quoted string | bare word
//! ```
//!
//! Supported fields: `project`, `key`, `assignee`, `status`, `statusCategory`,
//! `labels`, `text`. Anything else is rejected with `Error::InvalidInput`.

use std::cmp::Ordering;

use triage_core::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Eq,
    NotEq,
    Contains,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '~' => {
                chars.next();
                tokens.push(Token::Contains);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(Error::InvalidInput("JQL: expected '=' after '!'".into()));
                }
                tokens.push(Token::NotEq);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => break,
                        },
                        Some('"') => break,
                        Some(other) => value.push(other),
                        None => {
                            return Err(Error::InvalidInput("JQL: unterminated string".into()))
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || "()=!~\"".contains(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Contains,
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Cond { field: String, op: Op, value: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order_by: Option<OrderBy>,
}

/// Field values a filter is evaluated against.
pub trait JqlRecord {
    /// Single-valued field, lower-cased comparison is done by the evaluator.
    fn field(&self, name: &str) -> Option<String>;
    fn labels(&self) -> &[String];
    /// Free text searched by `text ~`.
    fn text(&self) -> String;
    fn is_done(&self) -> bool;
}

const FIELDS: &[&str] = &[
    "project",
    "key",
    "assignee",
    "status",
    "statuscategory",
    "labels",
    "text",
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_word(&self, word: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w.eq_ignore_ascii_case(word))
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn or_expr(&mut self) -> Result<Filter> {
        let mut parts = vec![self.and_expr()?];
        while self.peek_word("OR") {
            self.pos += 1;
            parts.push(self.and_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::Or(parts)
        })
    }

    fn and_expr(&mut self) -> Result<Filter> {
        let mut parts = vec![self.atom()?];
        while self.peek_word("AND") {
            self.pos += 1;
            parts.push(self.atom()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::And(parts)
        })
    }

    fn atom(&mut self) -> Result<Filter> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(Error::InvalidInput("JQL: expected ')'".into())),
                }
            }
            Some(Token::Word(field)) => {
                let field = field.to_lowercase();
                if !FIELDS.contains(&field.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "JQL: unsupported field '{}'",
                        field
                    )));
                }
                let op = match self.next() {
                    Some(Token::Eq) => Op::Eq,
                    Some(Token::NotEq) => Op::NotEq,
                    Some(Token::Contains) => Op::Contains,
                    other => {
                        return Err(Error::InvalidInput(format!(
                            "JQL: expected operator after '{}', got {:?}",
                            field, other
                        )))
                    }
                };
                let value = match self.next() {
                    Some(Token::Str(v)) | Some(Token::Word(v)) => v,
                    other => {
                        return Err(Error::InvalidInput(format!(
                            "JQL: expected value after '{}', got {:?}",
                            field, other
                        )))
                    }
                };
                Ok(Filter::Cond { field, op, value })
            }
            other => Err(Error::InvalidInput(format!(
                "JQL: unexpected token {:?}",
                other
            ))),
        }
    }
}

/// Parse a query in the supported subset.
pub fn parse(input: &str) -> Result<Query> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let filter = parser.or_expr()?;

    let order_by = if parser.peek_word("ORDER") {
        parser.pos += 1;
        if !parser.peek_word("BY") {
            return Err(Error::InvalidInput("JQL: expected BY after ORDER".into()));
        }
        parser.pos += 1;
        let field = match parser.next() {
            Some(Token::Word(f)) => f.to_lowercase(),
            _ => return Err(Error::InvalidInput("JQL: expected ORDER BY field".into())),
        };
        let descending = if parser.peek_word("DESC") {
            parser.pos += 1;
            true
        } else {
            if parser.peek_word("ASC") {
                parser.pos += 1;
            }
            false
        };
        Some(OrderBy { field, descending })
    } else {
        None
    };

    if parser.pos < parser.tokens.len() {
        return Err(Error::InvalidInput(format!(
            "JQL: trailing input at token {}",
            parser.pos
        )));
    }
    Ok(Query { filter, order_by })
}

impl Filter {
    /// Values compared against `field` anywhere in the expression.
    pub fn values_of(&self, field: &str) -> Vec<&str> {
        match self {
            Filter::Cond { field: f, value, .. } if f == field => vec![value.as_str()],
            Filter::Cond { .. } => Vec::new(),
            Filter::And(parts) | Filter::Or(parts) => {
                parts.iter().flat_map(|p| p.values_of(field)).collect()
            }
        }
    }

    pub fn matches<R: JqlRecord>(&self, record: &R) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(record)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(record)),
            Filter::Cond { field, op, value } => {
                let value = value.to_lowercase();
                let hit = match field.as_str() {
                    "statuscategory" => record.is_done() == (value == "done"),
                    "labels" => record.labels().iter().any(|l| l.to_lowercase() == value),
                    "text" => record.text().to_lowercase().contains(&value),
                    other => record
                        .field(other)
                        .map(|v| v.to_lowercase() == value)
                        .unwrap_or(false),
                };
                match op {
                    Op::NotEq => !hit,
                    Op::Eq | Op::Contains => hit,
                }
            }
        }
    }
}

/// Compare two optional sort keys; missing values sort last in either direction.
pub fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        key: &'static str,
        assignee: Option<&'static str>,
        done: bool,
        summary: &'static str,
        labels: Vec<String>,
    }

    impl JqlRecord for Rec {
        fn field(&self, name: &str) -> Option<String> {
            match name {
                "key" => Some(self.key.to_string()),
                "project" => self.key.split('-').next().map(str::to_string),
                "assignee" => self.assignee.map(str::to_string),
                _ => None,
            }
        }
        fn labels(&self) -> &[String] {
            &self.labels
        }
        fn text(&self) -> String {
            self.summary.to_string()
        }
        fn is_done(&self) -> bool {
            self.done
        }
    }

    fn rec(key: &'static str, assignee: Option<&'static str>, done: bool, summary: &'static str) -> Rec {
        Rec {
            key,
            assignee,
            done,
            summary,
            labels: vec!["hw".to_string()],
        }
    }

    #[test]
    fn test_open_assigned_query() {
        let q = parse(r#"project = "IT" AND assignee = "a1" AND statusCategory != Done"#).unwrap();
        assert!(q.order_by.is_none());
        assert!(q.filter.matches(&rec("IT-1", Some("a1"), false, "")));
        assert!(!q.filter.matches(&rec("IT-2", Some("a1"), true, "")));
        assert!(!q.filter.matches(&rec("IT-3", Some("a2"), false, "")));
        assert!(!q.filter.matches(&rec("HR-1", Some("a1"), false, "")));
        assert!(!q.filter.matches(&rec("IT-4", None, false, "")));
    }

    #[test]
    fn test_resolved_matching_query() {
        let q = parse(
            r#"project = "IT" AND key != "IT-9" AND statusCategory = Done AND (text ~ "VPN" OR text ~ "home") ORDER BY resolutiondate DESC"#,
        )
        .unwrap();
        assert_eq!(
            q.order_by,
            Some(OrderBy {
                field: "resolutiondate".to_string(),
                descending: true
            })
        );
        assert!(q.filter.matches(&rec("IT-1", None, true, "vpn broken")));
        assert!(q.filter.matches(&rec("IT-2", None, true, "working from HOME")));
        assert!(!q.filter.matches(&rec("IT-9", None, true, "vpn broken")));
        assert!(!q.filter.matches(&rec("IT-3", None, false, "vpn broken")));
        assert!(!q.filter.matches(&rec("IT-4", None, true, "printer")));
    }

    #[test]
    fn test_escaped_quotes_in_values() {
        let q = parse(r#"text ~ "say \"hi\"""#).unwrap();
        assert_eq!(
            q.filter,
            Filter::Cond {
                field: "text".to_string(),
                op: Op::Contains,
                value: "say \"hi\"".to_string()
            }
        );
    }

    #[test]
    fn test_values_of() {
        let q = parse(r#"project = "IT" AND (assignee = "a1" OR assignee = "a2")"#).unwrap();
        assert_eq!(q.filter.values_of("assignee"), vec!["a1", "a2"]);
        assert!(q.filter.values_of("key").is_empty());
    }

    #[test]
    fn test_labels_field() {
        let q = parse("labels = HW").unwrap();
        assert!(q.filter.matches(&rec("IT-1", None, false, "")));
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(matches!(parse("reporter = x"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse(r#"text ~ "open"#), Err(Error::InvalidInput(_))));
        assert!(matches!(parse("project = IT extra"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse("(project = IT"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_compare_optional_missing_last() {
        assert_eq!(compare_optional(Some(1), None, true), Ordering::Less);
        assert_eq!(compare_optional(Some(1), Some(2), true), Ordering::Greater);
        assert_eq!(compare_optional(Some(1), Some(2), false), Ordering::Less);
        assert_eq!(compare_optional::<i32>(None, Some(2), false), Ordering::Greater);
    }
}
