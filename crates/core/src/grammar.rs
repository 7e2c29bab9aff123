//! The rule table: an immutable, ordered, name-indexed set of rules.
//!
//! Construction runs every static check (duplicate names, undefined
//! references, empty repetition ranges, reversed class ranges) in one pass
//! over the complete table, so references may point forward and a `Grammar`
//! value is always internally consistent.

use crate::ast::{Alternative, ClassItem, ParsingExpression};
use crate::error::{CompileError, MatchError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A named rule. The first rule of a grammar is its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Rule {
    pub name: String,
    pub expression: ParsingExpression,
    /// `%action` written after the whole rule body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// `<Type>` written after the whole rule body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>, expression: ParsingExpression) -> Self {
        Rule {
            name: name.into(),
            expression,
            action: None,
            node_type: None,
        }
    }

    /// Build a rule from a single tagged alternative, lifting its tags onto
    /// the rule.
    pub fn from_alternative(name: impl Into<String>, alternative: Alternative) -> Self {
        Rule {
            name: name.into(),
            expression: alternative.expression,
            action: alternative.action,
            node_type: alternative.node_type,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }
}

/// A compiled grammar. Read-only after construction; `Send + Sync`, so one
/// instance can back any number of concurrent parse sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grammar {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    rules: Vec<Rule>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Grammar {
    /// Validate `rules` and build the table.
    pub fn new(name: Option<String>, rules: Vec<Rule>) -> Result<Grammar, CompileError> {
        if rules.is_empty() {
            return Err(CompileError::EmptyGrammar);
        }

        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), i).is_some() {
                return Err(CompileError::DuplicateRule {
                    name: rule.name.clone(),
                });
            }
        }

        for rule in &rules {
            let mut undefined = None;
            rule.expression.for_each_reference(&mut |target| {
                if undefined.is_none() && !index.contains_key(target) {
                    undefined = Some(target.to_string());
                }
            });
            if let Some(reference) = undefined {
                return Err(CompileError::UndefinedRule {
                    rule: rule.name.clone(),
                    reference,
                });
            }
            check_expression(&rule.name, &rule.expression)?;
        }

        tracing::debug!(
            grammar = name.as_deref().unwrap_or("<anonymous>"),
            rules = rules.len(),
            "compiled grammar"
        );

        Ok(Grammar { name, rules, index })
    }

    /// Compile `.peg` source text.
    pub fn compile(source: &str) -> Result<Grammar, CompileError> {
        crate::loader::compile(source)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The entry rule.
    pub fn root(&self) -> &Rule {
        // `new` rejects empty tables.
        &self.rules[0]
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse `input` from the root rule with no actions, no extensions and
    /// default options.
    pub fn parse(&self, input: &str) -> Result<crate::node::NodeRef, MatchError> {
        crate::parse::Parser::new(self).parse(input)
    }
}

fn check_expression(rule: &str, expr: &ParsingExpression) -> Result<(), CompileError> {
    match expr {
        ParsingExpression::CharClass(class) => {
            for item in &class.items {
                if let ClassItem::Range(from, to) = *item {
                    if from > to {
                        return Err(CompileError::InvalidClassRange {
                            rule: rule.to_string(),
                            from,
                            to,
                        });
                    }
                }
            }
        }
        ParsingExpression::Sequence { parts } => {
            for part in parts {
                check_expression(rule, &part.expression)?;
            }
        }
        ParsingExpression::Choice { alternatives } => {
            for alt in alternatives {
                check_expression(rule, &alt.expression)?;
            }
        }
        ParsingExpression::Repeat {
            expression,
            min,
            max,
        } => {
            if let Some(max) = *max {
                if max < *min || max == 0 {
                    return Err(CompileError::InvalidRepeat {
                        rule: rule.to_string(),
                        min: *min,
                        max,
                    });
                }
            }
            check_expression(rule, expression)?;
        }
        ParsingExpression::Optional { expression }
        | ParsingExpression::Lookahead { expression, .. } => {
            check_expression(rule, expression)?;
        }
        ParsingExpression::Literal { .. }
        | ParsingExpression::AnyChar
        | ParsingExpression::Reference { .. } => {}
    }
    Ok(())
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- ", self.name)?;
        if self.action.is_some() || self.node_type.is_some() {
            crate::ast::write_tagged(
                f,
                &self.expression,
                self.action.as_deref(),
                self.node_type.as_deref(),
            )
        } else {
            write!(f, "{}", self.expression)
        }
    }
}

/// Renders canonical `.peg` source; compiling it yields an equal grammar.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "grammar {}", name)?;
            writeln!(f)?;
        }
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}
