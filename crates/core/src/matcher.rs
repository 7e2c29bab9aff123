//! The packrat matcher.
//!
//! A [`Session`] interprets a grammar's expression AST against one input.
//! Every rule invocation is memoized by `(rule, offset)`, successes and
//! failures alike, so each pair is evaluated at most once per session and
//! actions never run twice for the same match.
//!
//! Failed terminals feed the furthest-failure report: a failure beyond the
//! current furthest offset replaces the expectation list, one at the same
//! offset extends it, and anything earlier is dropped.
//!
//! Invariant: when `eval` returns `Ok(None)` the cursor is where it was
//! before the call.

use crate::ast::{ParsingExpression, Polarity};
use crate::error::{Expectation, MatchError};
use crate::grammar::Grammar;
use crate::hooks::{Actions, Extensions};
use crate::node::NodeRef;
use rustc_hash::FxHashMap;
use std::ops::Range;
use std::rc::Rc;

/// A successful evaluation of an expression.
pub(crate) struct Matched {
    pub node: NodeRef,
    /// The zero-width stand-in of an `Optional` whose operand missed.
    /// Tags and decorators skip it.
    pub placeholder: bool,
}

impl Matched {
    pub(crate) fn from_node(node: NodeRef) -> Self {
        Matched {
            node,
            placeholder: false,
        }
    }
}

struct CacheEntry {
    node: Option<NodeRef>,
    end: usize,
}

/// The deepest point any terminal failed at, and what was expected there.
#[derive(Debug, Default)]
pub(crate) struct FailureState {
    pub offset: usize,
    pub expected: Vec<Expectation>,
}

impl FailureState {
    pub fn record(&mut self, offset: usize, rule: &str, description: String) {
        if offset > self.offset {
            self.offset = offset;
            self.expected.clear();
        } else if offset < self.offset {
            return;
        }
        self.expected.push(Expectation::new(rule, description));
    }
}

/// Per-parse mutable state. Created for one parse call and dropped after it.
pub(crate) struct Session<'g, 'h> {
    pub grammar: &'g Grammar,
    pub input: Rc<str>,
    pub chars: Vec<char>,
    /// Byte offset of every char boundary, including the end of input.
    byte_offsets: Vec<usize>,
    pub cursor: usize,
    cache: Vec<FxHashMap<usize, CacheEntry>>,
    pub failure: FailureState,
    current_rule: usize,
    depth: usize,
    max_depth: usize,
    pub actions: &'h mut dyn Actions,
    pub extensions: Option<&'h Extensions>,
}

impl<'g, 'h> Session<'g, 'h> {
    pub fn new(
        grammar: &'g Grammar,
        input: &str,
        actions: &'h mut dyn Actions,
        extensions: Option<&'h Extensions>,
        max_depth: usize,
    ) -> Self {
        let mut chars = Vec::with_capacity(input.len());
        let mut byte_offsets = Vec::with_capacity(input.len() + 1);
        for (i, c) in input.char_indices() {
            chars.push(c);
            byte_offsets.push(i);
        }
        byte_offsets.push(input.len());

        Session {
            grammar,
            input: Rc::from(input),
            chars,
            byte_offsets,
            cursor: 0,
            cache: (0..grammar.len()).map(|_| FxHashMap::default()).collect(),
            failure: FailureState::default(),
            current_rule: 0,
            depth: 0,
            max_depth,
            actions,
            extensions,
        }
    }

    /// Byte range of the characters `start..end`.
    pub fn span(&self, start: usize, end: usize) -> Range<usize> {
        self.byte_offsets[start]..self.byte_offsets[end]
    }

    pub fn at_end(&self) -> bool {
        self.cursor == self.chars.len()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.iter().map(|c| c.len()).sum()
    }

    /// Record a failed expectation for the rule currently being matched.
    pub fn expect(&mut self, offset: usize, description: String) {
        let rule = &self.grammar.rules()[self.current_rule].name;
        self.failure.record(offset, rule, description);
    }

    /// Record `description` against rule `index` rather than the current one.
    pub fn expect_for(&mut self, index: usize, offset: usize, description: String) {
        let rule = &self.grammar.rules()[index].name;
        self.failure.record(offset, rule, description);
    }

    // ──────────────────────────────────────────────
    // Rules
    // ──────────────────────────────────────────────

    /// Match rule `index` at the cursor, consulting and filling the memo.
    pub fn match_rule(&mut self, index: usize) -> Result<Option<NodeRef>, MatchError> {
        let start = self.cursor;
        let grammar = self.grammar;
        let rule = &grammar.rules()[index];

        if let Some(entry) = self.cache[index].get(&start) {
            tracing::trace!(rule = %rule.name, offset = start, "memo hit");
            self.cursor = entry.end;
            return Ok(entry.node.clone());
        }

        let outer_rule = std::mem::replace(&mut self.current_rule, index);
        let result = self.eval(&rule.expression);
        self.current_rule = outer_rule;

        let node = match result? {
            Some(matched) => Some(self.finish_rule(index, start, matched)?),
            None => None,
        };
        self.cache[index].insert(
            start,
            CacheEntry {
                node: node.clone(),
                end: self.cursor,
            },
        );
        Ok(node)
    }

    // ──────────────────────────────────────────────
    // Expressions
    // ──────────────────────────────────────────────

    /// Evaluate `expr` at the cursor. Every call counts towards the depth
    /// limit, so nesting through rules, groups and operators alike is
    /// bounded before the native stack is.
    pub(crate) fn eval(&mut self, expr: &ParsingExpression) -> Result<Option<Matched>, MatchError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let rule = &self.grammar.rules()[self.current_rule].name;
            tracing::debug!(
                rule = %rule,
                offset = self.cursor,
                depth = self.depth,
                "nesting too deep"
            );
            return Err(MatchError::DepthExceeded {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        let result = self.dispatch(expr);
        self.depth -= 1;
        result
    }

    /// Record the failure of terminal `expr` at `offset`.
    fn expect_terminal(&mut self, offset: usize, expr: &ParsingExpression) {
        if let Some(description) = expr.describe() {
            self.expect(offset, description);
        }
    }

    fn dispatch(&mut self, expr: &ParsingExpression) -> Result<Option<Matched>, MatchError> {
        let start = self.cursor;
        match expr {
            ParsingExpression::Literal {
                text,
                case_sensitive,
            } => {
                let mut end = start;
                for expected in text.chars() {
                    let matches = match self.chars.get(end) {
                        Some(&c) if *case_sensitive => c == expected,
                        Some(&c) => eq_ignore_case(c, expected),
                        None => false,
                    };
                    if !matches {
                        self.expect_terminal(start, expr);
                        return Ok(None);
                    }
                    end += 1;
                }
                self.cursor = end;
                Ok(Some(Matched::from_node(self.leaf(start, end))))
            }

            ParsingExpression::CharClass(class) => match self.chars.get(start) {
                Some(&c) if class.matches(c) => {
                    self.cursor = start + 1;
                    Ok(Some(Matched::from_node(self.leaf(start, start + 1))))
                }
                _ => {
                    self.expect_terminal(start, expr);
                    Ok(None)
                }
            },

            ParsingExpression::AnyChar => {
                if start < self.chars.len() {
                    self.cursor = start + 1;
                    Ok(Some(Matched::from_node(self.leaf(start, start + 1))))
                } else {
                    self.expect_terminal(start, expr);
                    Ok(None)
                }
            }

            ParsingExpression::Reference { rule } => {
                let index =
                    self.grammar
                        .rule_index(rule)
                        .ok_or_else(|| MatchError::UnknownRule {
                            name: rule.clone(),
                        })?;
                Ok(self.match_rule(index)?.map(Matched::from_node))
            }

            ParsingExpression::Sequence { parts } => {
                let mut elements = Vec::with_capacity(parts.len());
                for part in parts {
                    match self.eval(&part.expression)? {
                        Some(matched) => elements.push(matched.node),
                        None => {
                            self.cursor = start;
                            return Ok(None);
                        }
                    }
                }
                Ok(Some(Matched::from_node(self.sequence_node(start, parts, elements))))
            }

            ParsingExpression::Choice { alternatives } => {
                for alt in alternatives {
                    if let Some(matched) = self.eval(&alt.expression)? {
                        let node = self.apply_tags(
                            alt.action.as_deref(),
                            alt.node_type.as_deref(),
                            start,
                            matched,
                        )?;
                        return Ok(Some(node));
                    }
                    self.cursor = start;
                }
                Ok(None)
            }

            ParsingExpression::Repeat {
                expression,
                min,
                max,
            } => {
                let mut items = Vec::new();
                let mut saturated = false;
                while max.map_or(true, |max| items.len() < max) {
                    let before = self.cursor;
                    match self.eval(expression)? {
                        Some(matched) => items.push(matched.node),
                        None => break,
                    }
                    // Once an iteration matches without consuming, every
                    // further one would match the same empty text.
                    if self.cursor == before {
                        saturated = true;
                        break;
                    }
                }
                if items.len() < *min && !saturated {
                    self.cursor = start;
                    return Ok(None);
                }
                Ok(Some(Matched::from_node(self.repeat_node(start, items))))
            }

            ParsingExpression::Optional { expression } => match self.eval(expression)? {
                Some(matched) => Ok(Some(matched)),
                None => Ok(Some(Matched {
                    node: self.leaf(start, start),
                    placeholder: true,
                })),
            },

            ParsingExpression::Lookahead {
                expression,
                polarity,
            } => {
                let matched = self.eval(expression)?.is_some();
                self.cursor = start;
                let succeeded = match polarity {
                    Polarity::Positive => matched,
                    Polarity::Negative => !matched,
                };
                if succeeded {
                    Ok(Some(Matched::from_node(self.leaf(start, start))))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
