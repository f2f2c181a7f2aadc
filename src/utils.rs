use std::fmt;
use std::io;
use thiserror::Error;

/// Maximum depth of wildcard-content re-parsing before generation gives up.
pub const MAX_RECURSION_DEPTH: usize = 20;

/// Custom error types for prompt generation
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Recursion limit of {limit} exceeded while resolving {template:?}")]
    RecursionLimit { limit: usize, template: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// What went wrong while parsing a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A metacharacter showed up where the grammar does not allow it
    UnexpectedCharacter(char),
    /// `{` without a matching `}`
    UnclosedVariant,
    /// The segment before `$$` is not `N`, `N-`, `-M` or `N-M`
    InvalidBound,
    /// `__name` without the closing `__`
    UnterminatedWildcard,
    /// `____`
    EmptyWildcard,
    /// `(` or `[` without a matching closer
    UnclosedGroup,
    /// A bracket group closed with the wrong bracket
    MismatchedGroup,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedCharacter(ch) => write!(f, "unexpected '{}'", ch),
            ParseErrorKind::UnclosedVariant => f.write_str("unclosed variant"),
            ParseErrorKind::InvalidBound => f.write_str("invalid bound expression"),
            ParseErrorKind::UnterminatedWildcard => f.write_str("unterminated wildcard"),
            ParseErrorKind::EmptyWildcard => f.write_str("empty wildcard name"),
            ParseErrorKind::UnclosedGroup => f.write_str("unclosed bracket group"),
            ParseErrorKind::MismatchedGroup => f.write_str("mismatched bracket"),
        }
    }
}

/// A malformed template. `position` is a byte offset into the template after
/// comments have been stripped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte {position}: {fragment:?}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub fragment: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize, fragment: &str) -> Self {
        ParseError {
            kind,
            fragment: fragment.to_string(),
            position,
        }
    }
}

/// Join the non-empty pieces with `separator`.
pub fn join_non_empty<S: AsRef<str>>(parts: &[S], separator: &str) -> String {
    let mut result = String::new();
    for part in parts.iter().map(AsRef::as_ref).filter(|p| !p.is_empty()) {
        if !result.is_empty() {
            result.push_str(separator);
        }
        result.push_str(part);
    }
    result
}

/// Join two already-rendered halves of a sequence, skipping empty ones.
pub fn join_pair(head: &str, tail: &str, separator: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{}{}{}", head, separator, tail),
    }
}

/// Drop repeated values, keeping the first occurrence of each.
pub fn dedupe_in_order(values: Vec<String>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    distinct
}
