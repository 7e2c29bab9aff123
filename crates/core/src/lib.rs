#![allow(clippy::result_large_err)]
//! packrat-core: PEG grammar compiler and memoizing packrat matcher.
//!
//! `.peg` source is compiled into an immutable rule table by a loader that
//! parses the grammar language with this same engine. A [`Parser`] then
//! runs any compiled grammar over input text, memoizing every
//! `(rule, offset)` result, and builds a tree of [`TreeNode`]s shaped by
//! labels, mutes, `%action` callbacks and `<Type>` extensions. Failures
//! report the furthest offset reached and everything expected there.
//!
//! # Public API
//!
//! - [`compile()`] / [`Grammar::compile`] -- `.peg` source to [`Grammar`]
//! - [`Grammar::parse`], [`Parser`], [`parse()`] -- run a grammar
//! - [`TreeNode`], [`Node`], [`ValueNode`] -- parse-tree nodes
//! - [`Actions`], [`ActionTable`], [`Extensions`] -- caller hooks
//! - [`ParseOptions`] -- per-parse configuration
//! - [`to_interchange`] / [`from_interchange`] -- rule table as JSON
//! - Errors: [`CompileError`], [`MatchError`], [`ParseError`],
//!   [`ActionError`], [`InterchangeError`]

pub mod ast;
mod builder;
pub mod error;
pub mod grammar;
pub mod hooks;
pub mod interchange;
pub mod loader;
mod matcher;
pub mod node;
pub mod options;
pub mod parse;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    Alternative, CharClass, ClassItem, ParsingExpression, Polarity, SequencePart, Shorthand,
};
pub use error::{ActionError, CompileError, Expectation, InterchangeError, MatchError, ParseError};
pub use grammar::{Grammar, Rule};
pub use hooks::{ActionTable, Actions, Extensions, NoActions};
pub use node::{Node, NodeRef, TreeNode, ValueNode};
pub use options::ParseOptions;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use interchange::{from_interchange, to_interchange};
pub use loader::{compile, PEG_GRAMMAR};
pub use parse::{parse, Parser};
