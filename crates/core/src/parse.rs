//! The public matching API.
//!
//! A parse succeeds only if the start rule matches *and* consumes the whole
//! input. When the start rule matches a prefix, an `<EOF>` expectation is
//! recorded at the stopping offset through the normal furthest-failure
//! bookkeeping before the error is reported. A failure that recorded no
//! terminal at all (only predicates rejected) also reports `<EOF>`, at the
//! root's start.

use crate::error::{MatchError, ParseError};
use crate::grammar::Grammar;
use crate::hooks::{Actions, Extensions, NoActions};
use crate::matcher::Session;
use crate::node::NodeRef;
use crate::options::ParseOptions;

/// Builder for one or more parses against a grammar.
///
/// ```ignore
/// let mut actions = ActionTable::new().with("num", |text, offset, _| { /* ... */ });
/// let tree = Parser::new(&grammar)
///     .with_actions(&mut actions)
///     .with_options(ParseOptions::default().with_max_depth(64))
///     .parse("1+2")?;
/// ```
pub struct Parser<'g, 'h> {
    grammar: &'g Grammar,
    actions: Option<&'h mut dyn Actions>,
    extensions: Option<&'h Extensions>,
    options: ParseOptions,
}

impl<'g, 'h> Parser<'g, 'h> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Parser {
            grammar,
            actions: None,
            extensions: None,
            options: ParseOptions::default(),
        }
    }

    pub fn with_actions(mut self, actions: &'h mut dyn Actions) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_extensions(mut self, extensions: &'h Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse `input` in a fresh session.
    pub fn parse(&mut self, input: &str) -> Result<NodeRef, MatchError> {
        let grammar = self.grammar;
        let root = match &self.options.root {
            Some(name) => grammar
                .rule_index(name)
                .ok_or_else(|| MatchError::UnknownRule { name: name.clone() })?,
            None => 0,
        };
        let root_name = grammar.rules()[root].name.as_str();

        let mut no_actions = NoActions;
        let actions: &mut dyn Actions = match self.actions.as_deref_mut() {
            Some(actions) => actions,
            None => &mut no_actions,
        };

        tracing::debug!(root = root_name, input_len = input.len(), "parse started");
        let mut session = Session::new(
            grammar,
            input,
            actions,
            self.extensions,
            self.options.max_depth,
        );

        let matched = match session.match_rule(root) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(root = root_name, error = %e, "parse aborted");
                return Err(e);
            }
        };

        match matched {
            Some(node) if session.at_end() => {
                tracing::debug!(
                    root = root_name,
                    cache_entries = session.cache_size(),
                    "parse succeeded"
                );
                Ok(node)
            }
            matched => {
                if matched.is_some() || session.failure.expected.is_empty() {
                    let end = session.cursor;
                    session.expect_for(root, end, "<EOF>".to_string());
                }
                let expected = std::mem::take(&mut session.failure.expected);
                let error = ParseError::new(&session.chars, session.failure.offset, expected);
                tracing::debug!(
                    root = root_name,
                    offset = error.offset,
                    cache_entries = session.cache_size(),
                    "parse failed"
                );
                Err(MatchError::Parse(error))
            }
        }
    }
}

/// Parse `input` from the grammar's root rule.
pub fn parse(
    grammar: &Grammar,
    input: &str,
    actions: Option<&mut dyn Actions>,
    extensions: Option<&Extensions>,
) -> Result<NodeRef, MatchError> {
    let mut parser = Parser::new(grammar);
    if let Some(actions) = actions {
        parser = parser.with_actions(actions);
    }
    if let Some(extensions) = extensions {
        parser = parser.with_extensions(extensions);
    }
    parser.parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParsingExpression;
    use crate::error::Expectation;
    use crate::grammar::Rule;

    fn first_match_grammar() -> Grammar {
        Grammar::new(
            None,
            vec![Rule::new(
                "r",
                ParsingExpression::choice(vec![
                    ParsingExpression::literal("a").into(),
                    ParsingExpression::literal("ab").into(),
                ]),
            )],
        )
        .unwrap()
    }

    #[test]
    fn unconsumed_input_reports_eof_at_stop() {
        let g = first_match_grammar();
        let err = g.parse("ab").unwrap_err();
        let err = err.as_parse_error().unwrap();
        assert_eq!(err.offset, 1);
        assert_eq!(err.expected, vec![Expectation::new("r", "<EOF>")]);
        assert_eq!(err.message, "parse error at line 1, column 2: expected <EOF>");
    }

    #[test]
    fn predicate_only_failure_still_names_an_expectation() {
        let g = Grammar::new(
            None,
            vec![Rule::new(
                "r",
                ParsingExpression::sequence(vec![
                    ParsingExpression::lookahead(
                        ParsingExpression::literal("a"),
                        crate::ast::Polarity::Negative,
                    )
                    .into(),
                    ParsingExpression::AnyChar.into(),
                ]),
            )],
        )
        .unwrap();
        let err = g.parse("a").unwrap_err();
        let err = err.as_parse_error().unwrap();
        assert_eq!(err.offset, 0);
        assert_eq!(err.expected, vec![Expectation::new("r", "<EOF>")]);
        assert_eq!(err.message, "parse error at line 1, column 1: expected <EOF>");
    }

    #[test]
    fn full_match_returns_root_node() {
        let g = first_match_grammar();
        let node = g.parse("a").unwrap();
        assert_eq!(node.text(), "a");
        assert_eq!(node.offset(), 0);
    }

    #[test]
    fn root_override_selects_start_rule() {
        let g = Grammar::new(
            None,
            vec![
                Rule::new("a", ParsingExpression::literal("a")),
                Rule::new("b", ParsingExpression::literal("b")),
            ],
        )
        .unwrap();
        let node = Parser::new(&g)
            .with_options(ParseOptions::default().with_root("b"))
            .parse("b")
            .unwrap();
        assert_eq!(node.text(), "b");

        let err = Parser::new(&g)
            .with_options(ParseOptions::default().with_root("zzz"))
            .parse("b")
            .unwrap_err();
        assert_eq!(err, MatchError::UnknownRule { name: "zzz".into() });
    }

    #[test]
    fn free_function_accepts_optional_hooks() {
        let g = first_match_grammar();
        assert!(parse(&g, "a", None, None).is_ok());
        assert!(parse(&g, "b", None, None).is_err());
    }
}
