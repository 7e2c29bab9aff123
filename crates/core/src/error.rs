//! Error types for grammar compilation and matching.
//!
//! Three kinds of failure leave the engine:
//! - [`CompileError`]: the `.peg` source or rule table is defective. No
//!   grammar is produced.
//! - [`ParseError`]: the input does not match. Carries the furthest-failure
//!   diagnostics of the session.
//! - [`ActionError`]: a caller action refused a match. It unwinds the whole
//!   parse and is surfaced unchanged inside [`MatchError::Action`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// Parse diagnostics
// ──────────────────────────────────────────────

/// One thing the matcher would have accepted at the furthest failure offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expectation {
    /// The rule that was being matched when the terminal failed.
    pub rule: String,
    /// The terminal in PEG syntax, e.g. `"<-"`, `[a-z]`, `<any char>`.
    pub expected: String,
}

impl Expectation {
    pub fn new(rule: impl Into<String>, expected: impl Into<String>) -> Self {
        Expectation {
            rule: rule.into(),
            expected: expected.into(),
        }
    }
}

/// The input did not match the root rule, or matched without consuming all
/// of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    /// Character offset of the furthest failure.
    pub offset: usize,
    /// 1-based line of `offset`.
    pub line: usize,
    /// 1-based column of `offset`, in characters.
    pub column: usize,
    pub expected: Vec<Expectation>,
    pub message: String,
}

impl ParseError {
    /// Build the error for a failure at character `offset` of `input`.
    pub fn new(input: &[char], offset: usize, expected: Vec<Expectation>) -> Self {
        let (line, column) = line_column(input, offset);
        let message = format_message(line, column, &expected);
        ParseError {
            offset,
            line,
            column,
            expected,
            message,
        }
    }
}

/// 1-based line and column of character `offset`, counting `\n` as the only
/// line break.
pub fn line_column(input: &[char], offset: usize) -> (usize, usize) {
    let end = offset.min(input.len());
    let mut line = 1;
    let mut line_start = 0;
    for (i, c) in input[..end].iter().enumerate() {
        if *c == '\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, offset - line_start + 1)
}

fn format_message(line: usize, column: usize, expected: &[Expectation]) -> String {
    let mut descriptions: Vec<&str> = Vec::with_capacity(expected.len());
    for e in expected {
        if !descriptions.contains(&e.expected.as_str()) {
            descriptions.push(&e.expected);
        }
    }
    let mut message = format!("parse error at line {}, column {}", line, column);
    if let Some((last, rest)) = descriptions.split_last() {
        message.push_str(": expected ");
        if !rest.is_empty() {
            message.push_str(&rest.join(", "));
            message.push_str(" or ");
        }
        message.push_str(last);
    }
    message
}

// ──────────────────────────────────────────────
// Caller actions
// ──────────────────────────────────────────────

/// Raised by a caller-supplied action callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("action '{action}' failed: {message}")]
pub struct ActionError {
    pub action: String,
    pub message: String,
}

impl ActionError {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError {
            action: action.into(),
            message: message.into(),
        }
    }
}

// ──────────────────────────────────────────────
// Matching
// ──────────────────────────────────────────────

/// Everything a parse call can return instead of a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Surfaced verbatim; never folded into the furthest-failure report.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Expression evaluations nested deeper than `ParseOptions::max_depth`.
    #[error("maximum nesting depth exceeded: {depth} > {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },

    /// The requested start rule does not exist in the grammar.
    #[error("unknown start rule '{name}'")]
    UnknownRule { name: String },
}

impl MatchError {
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            MatchError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────
// Compilation
// ──────────────────────────────────────────────

/// A grammar could not be compiled. Detected before any input is matched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The `.peg` source does not match the PEG language.
    #[error("grammar syntax: {0}")]
    Syntax(ParseError),

    #[error("grammar has no rules")]
    EmptyGrammar,

    #[error("duplicate rule '{name}'")]
    DuplicateRule { name: String },

    #[error("rule '{rule}' references undefined rule '{reference}'")]
    UndefinedRule { rule: String, reference: String },

    #[error("rule '{rule}' has an empty repetition range {{{min},{max}}}")]
    InvalidRepeat { rule: String, min: usize, max: usize },

    #[error("rule '{rule}' contains invalid escape '{sequence}'")]
    InvalidEscape { rule: String, sequence: String },

    #[error("rule '{rule}' contains reversed class range '{from}-{to}'")]
    InvalidClassRange { rule: String, from: char, to: char },

    /// The loader's own parse was aborted or produced a tree it cannot read.
    #[error("grammar loader failed: {0}")]
    Loader(String),
}

/// A serialised rule table could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("document missing required field: '{field}'")]
    MissingField { field: String },

    #[error("unexpected interchange format '{found}' (expected '{expected}')")]
    Format { expected: String, found: String },

    #[error("unsupported interchange version '{found}' (expected '{expected}')")]
    Version { expected: String, found: String },

    #[error("malformed grammar document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.expected, self.rule)
    }
}
