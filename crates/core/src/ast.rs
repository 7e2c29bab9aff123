//! Expression AST for compiled grammars.
//!
//! These types are produced by the loader (or built by hand) and read by the
//! matcher. Rules never own one another: a [`ParsingExpression::Reference`]
//! names its target and is resolved through the owning
//! [`Grammar`](crate::grammar::Grammar) at match time, so recursive grammars
//! need no cyclic ownership.
//!
//! `Display` renders every expression back to `.peg` syntax. Compiling the
//! rendered text of a grammar yields an equal grammar.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

// ──────────────────────────────────────────────
// Parsing expressions
// ──────────────────────────────────────────────

/// A parsing expression: the body of a rule or any sub-expression of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsingExpression {
    /// A fixed string; compared exactly or ignoring case.
    Literal { text: String, case_sensitive: bool },
    /// One character drawn from (or, negated, outside of) a set.
    CharClass(CharClass),
    /// Any single character.
    AnyChar,
    /// An invocation of another rule, by name.
    Reference { rule: String },
    /// Parts matched left to right; each position may be labelled or muted.
    Sequence { parts: Vec<SequencePart> },
    /// Ordered choice: the first alternative to match wins.
    Choice { alternatives: Vec<Alternative> },
    /// Greedy repetition between `min` and `max` (unbounded when `None`).
    Repeat {
        expression: Box<ParsingExpression>,
        min: usize,
        max: Option<usize>,
    },
    /// Zero or one occurrence; never fails.
    Optional { expression: Box<ParsingExpression> },
    /// `&e` / `!e`: tests `e` without consuming input.
    Lookahead {
        expression: Box<ParsingExpression>,
        polarity: Polarity,
    },
}

/// Whether a lookahead requires its operand to match (`&`) or not to (`!`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

/// One position of a [`ParsingExpression::Sequence`].
///
/// Labels and mute flags belong to the position, not to the expression that
/// fills it: the same rule can be labelled in one sequence and muted in
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePart {
    pub expression: ParsingExpression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub muted: bool,
}

/// One alternative of a [`ParsingExpression::Choice`], with the optional
/// `%action` and `<Type>` tags written after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub expression: ParsingExpression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

// ──────────────────────────────────────────────
// Character classes
// ──────────────────────────────────────────────

/// The set behind a `[...]` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negate: bool,
    pub items: Vec<ClassItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassItem {
    Char(char),
    /// Inclusive range, `from <= to`.
    Range(char, char),
    Shorthand(Shorthand),
}

/// Backslash shorthands accepted inside classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shorthand {
    Digit,
    NotDigit,
    Word,
    NotWord,
    Space,
    NotSpace,
}

impl Shorthand {
    pub fn from_escape(c: char) -> Option<Shorthand> {
        match c {
            'd' => Some(Shorthand::Digit),
            'D' => Some(Shorthand::NotDigit),
            'w' => Some(Shorthand::Word),
            'W' => Some(Shorthand::NotWord),
            's' => Some(Shorthand::Space),
            'S' => Some(Shorthand::NotSpace),
            _ => None,
        }
    }

    fn escape(self) -> char {
        match self {
            Shorthand::Digit => 'd',
            Shorthand::NotDigit => 'D',
            Shorthand::Word => 'w',
            Shorthand::NotWord => 'W',
            Shorthand::Space => 's',
            Shorthand::NotSpace => 'S',
        }
    }

    fn contains(self, c: char) -> bool {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        match self {
            Shorthand::Digit => c.is_ascii_digit(),
            Shorthand::NotDigit => !c.is_ascii_digit(),
            Shorthand::Word => is_word,
            Shorthand::NotWord => !is_word,
            Shorthand::Space => c.is_whitespace(),
            Shorthand::NotSpace => !c.is_whitespace(),
        }
    }
}

impl ClassItem {
    fn contains(self, c: char) -> bool {
        match self {
            ClassItem::Char(x) => x == c,
            ClassItem::Range(from, to) => from <= c && c <= to,
            ClassItem::Shorthand(s) => s.contains(c),
        }
    }
}

impl CharClass {
    pub fn new(negate: bool, items: Vec<ClassItem>) -> Self {
        CharClass { negate, items }
    }

    /// Does `c` belong to the class (after negation)?
    pub fn matches(&self, c: char) -> bool {
        self.items.iter().any(|item| item.contains(c)) != self.negate
    }
}

// ──────────────────────────────────────────────
// Construction helpers
// ──────────────────────────────────────────────

impl ParsingExpression {
    pub fn literal(text: impl Into<String>) -> Self {
        ParsingExpression::Literal {
            text: text.into(),
            case_sensitive: true,
        }
    }

    pub fn literal_ci(text: impl Into<String>) -> Self {
        ParsingExpression::Literal {
            text: text.into(),
            case_sensitive: false,
        }
    }

    pub fn class(negate: bool, items: Vec<ClassItem>) -> Self {
        ParsingExpression::CharClass(CharClass::new(negate, items))
    }

    pub fn reference(rule: impl Into<String>) -> Self {
        ParsingExpression::Reference { rule: rule.into() }
    }

    pub fn sequence(parts: Vec<SequencePart>) -> Self {
        ParsingExpression::Sequence { parts }
    }

    pub fn choice(alternatives: Vec<Alternative>) -> Self {
        ParsingExpression::Choice { alternatives }
    }

    pub fn repeat(expression: ParsingExpression, min: usize, max: Option<usize>) -> Self {
        ParsingExpression::Repeat {
            expression: Box::new(expression),
            min,
            max,
        }
    }

    pub fn zero_or_more(expression: ParsingExpression) -> Self {
        Self::repeat(expression, 0, None)
    }

    pub fn one_or_more(expression: ParsingExpression) -> Self {
        Self::repeat(expression, 1, None)
    }

    pub fn optional(expression: ParsingExpression) -> Self {
        ParsingExpression::Optional {
            expression: Box::new(expression),
        }
    }

    pub fn lookahead(expression: ParsingExpression, polarity: Polarity) -> Self {
        ParsingExpression::Lookahead {
            expression: Box::new(expression),
            polarity,
        }
    }

    /// The text reported for this expression when it fails to match.
    /// Only terminals record expectations, so only they have one.
    pub fn describe(&self) -> Option<String> {
        match self {
            ParsingExpression::AnyChar => Some("<any char>".to_string()),
            ParsingExpression::Literal { .. } | ParsingExpression::CharClass(_) => {
                Some(self.to_string())
            }
            _ => None,
        }
    }

    /// Visit every rule name referenced anywhere inside this expression.
    pub fn for_each_reference<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            ParsingExpression::Reference { rule } => f(rule),
            ParsingExpression::Sequence { parts } => {
                for part in parts {
                    part.expression.for_each_reference(f);
                }
            }
            ParsingExpression::Choice { alternatives } => {
                for alt in alternatives {
                    alt.expression.for_each_reference(f);
                }
            }
            ParsingExpression::Repeat { expression, .. }
            | ParsingExpression::Optional { expression }
            | ParsingExpression::Lookahead { expression, .. } => {
                expression.for_each_reference(f);
            }
            ParsingExpression::Literal { .. }
            | ParsingExpression::CharClass(_)
            | ParsingExpression::AnyChar => {}
        }
    }
}

impl SequencePart {
    pub fn new(expression: ParsingExpression) -> Self {
        SequencePart {
            expression,
            label: None,
            muted: false,
        }
    }

    pub fn labeled(label: impl Into<String>, expression: ParsingExpression) -> Self {
        SequencePart {
            expression,
            label: Some(label.into()),
            muted: false,
        }
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }
}

impl From<ParsingExpression> for SequencePart {
    fn from(expression: ParsingExpression) -> Self {
        SequencePart::new(expression)
    }
}

impl Alternative {
    pub fn new(expression: ParsingExpression) -> Self {
        Alternative {
            expression,
            action: None,
            node_type: None,
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

    pub fn is_tagged(&self) -> bool {
        self.action.is_some() || self.node_type.is_some()
    }
}

impl From<ParsingExpression> for Alternative {
    fn from(expression: ParsingExpression) -> Self {
        Alternative::new(expression)
    }
}

// ──────────────────────────────────────────────
// Rendering back to .peg syntax
// ──────────────────────────────────────────────

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, specials: &[char]) -> fmt::Result {
    for c in text.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\\' => f.write_str("\\\\")?,
            c if specials.contains(&c) => write!(f, "\\{}", c)?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

const CLASS_SPECIALS: &[char] = &[']', '^', '-'];

fn write_class_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    let mut buf = [0u8; 4];
    write_escaped(f, c.encode_utf8(&mut buf), CLASS_SPECIALS)
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        if self.negate {
            f.write_char('^')?;
        }
        for item in &self.items {
            match *item {
                ClassItem::Char(c) => write_class_char(f, c)?,
                ClassItem::Range(from, to) => {
                    write_class_char(f, from)?;
                    f.write_char('-')?;
                    write_class_char(f, to)?;
                }
                ClassItem::Shorthand(s) => write!(f, "\\{}", s.escape())?,
            }
        }
        f.write_char(']')
    }
}

/// Render `expr` where the grammar expects an `atom`: terminals, references
/// and lookaheads stand alone, anything else is parenthesised.
fn write_atom(f: &mut fmt::Formatter<'_>, expr: &ParsingExpression) -> fmt::Result {
    match expr {
        ParsingExpression::Literal { .. }
        | ParsingExpression::CharClass(_)
        | ParsingExpression::AnyChar
        | ParsingExpression::Reference { .. }
        | ParsingExpression::Lookahead { .. } => write!(f, "{}", expr),
        _ => write!(f, "({})", expr),
    }
}

/// Render `expr` as the body of a sequence part: quantified atoms stand alone.
fn write_part_body(f: &mut fmt::Formatter<'_>, expr: &ParsingExpression) -> fmt::Result {
    match expr {
        ParsingExpression::Repeat { .. } | ParsingExpression::Optional { .. } => {
            write!(f, "{}", expr)
        }
        _ => write_atom(f, expr),
    }
}

fn write_part(f: &mut fmt::Formatter<'_>, part: &SequencePart) -> fmt::Result {
    if part.muted {
        f.write_char('@')?;
    }
    if let Some(label) = &part.label {
        write!(f, "{}:", label)?;
    }
    write_part_body(f, &part.expression)
}

/// Render an expression followed by its `%action <Type>` tags.
pub(crate) fn write_tagged(
    f: &mut fmt::Formatter<'_>,
    expr: &ParsingExpression,
    action: Option<&str>,
    node_type: Option<&str>,
) -> fmt::Result {
    match expr {
        ParsingExpression::Choice { .. } => write!(f, "({})", expr)?,
        ParsingExpression::Sequence { .. } => write!(f, "{}", expr)?,
        _ => write_part_body(f, expr)?,
    }
    if let Some(action) = action {
        write!(f, " %{}", action)?;
    }
    if let Some(node_type) = node_type {
        write!(f, " <{}>", node_type)?;
    }
    Ok(())
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tagged(
            f,
            &self.expression,
            self.action.as_deref(),
            self.node_type.as_deref(),
        )
    }
}

impl fmt::Display for ParsingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingExpression::Literal {
                text,
                case_sensitive: true,
            } => {
                f.write_char('"')?;
                write_escaped(f, text, &['"'])?;
                f.write_char('"')
            }
            ParsingExpression::Literal {
                text,
                case_sensitive: false,
            } => {
                f.write_char('`')?;
                write_escaped(f, text, &['`'])?;
                f.write_char('`')
            }
            ParsingExpression::CharClass(class) => write!(f, "{}", class),
            ParsingExpression::AnyChar => f.write_char('.'),
            ParsingExpression::Reference { rule } => f.write_str(rule),
            ParsingExpression::Sequence { parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_char(' ')?;
                    }
                    write_part(f, part)?;
                }
                Ok(())
            }
            ParsingExpression::Choice { alternatives } => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" / ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                Ok(())
            }
            ParsingExpression::Repeat {
                expression,
                min,
                max,
            } => {
                write_atom(f, expression)?;
                match (min, max) {
                    (0, None) => f.write_char('*'),
                    (1, None) => f.write_char('+'),
                    (n, None) => write!(f, "{{{},}}", n),
                    (n, Some(m)) if n == m => write!(f, "{{{}}}", n),
                    (n, Some(m)) => write!(f, "{{{},{}}}", n, m),
                }
            }
            ParsingExpression::Optional { expression } => {
                write_atom(f, expression)?;
                f.write_char('?')
            }
            ParsingExpression::Lookahead {
                expression,
                polarity,
            } => {
                f.write_char(match polarity {
                    Polarity::Positive => '&',
                    Polarity::Negative => '!',
                })?;
                write_atom(f, expression)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_membership_respects_negation() {
        let class = CharClass::new(
            false,
            vec![ClassItem::Range('a', 'f'), ClassItem::Char('_')],
        );
        assert!(class.matches('c'));
        assert!(class.matches('_'));
        assert!(!class.matches('g'));

        let negated = CharClass::new(true, class.items.clone());
        assert!(!negated.matches('c'));
        assert!(negated.matches('G'));
    }

    #[test]
    fn shorthands_match_their_ascii_sets() {
        let class = CharClass::new(false, vec![ClassItem::Shorthand(Shorthand::Word)]);
        assert!(class.matches('Z'));
        assert!(class.matches('_'));
        assert!(!class.matches('-'));
        let space = CharClass::new(false, vec![ClassItem::Shorthand(Shorthand::Space)]);
        assert!(space.matches('\n'));
        assert!(!space.matches('x'));
    }

    #[test]
    fn terminals_describe_themselves_in_peg_syntax() {
        assert_eq!(
            ParsingExpression::literal("<-").describe().as_deref(),
            Some("\"<-\"")
        );
        assert_eq!(
            ParsingExpression::literal_ci("grammar").describe().as_deref(),
            Some("`grammar`")
        );
        assert_eq!(
            ParsingExpression::class(true, vec![ClassItem::Char('"')])
                .describe()
                .as_deref(),
            Some("[^\"]")
        );
        assert_eq!(
            ParsingExpression::class(true, vec![ClassItem::Char(']')])
                .describe()
                .as_deref(),
            Some("[^\\]]")
        );
        assert_eq!(
            ParsingExpression::AnyChar.describe().as_deref(),
            Some("<any char>")
        );
        assert_eq!(ParsingExpression::reference("x").describe(), None);
    }

    #[test]
    fn rendering_parenthesises_compound_operands() {
        let expr = ParsingExpression::sequence(vec![
            SequencePart::labeled("k", ParsingExpression::reference("key")),
            SequencePart::new(ParsingExpression::literal(":")).muted(),
            SequencePart::new(ParsingExpression::zero_or_more(
                ParsingExpression::choice(vec![
                    ParsingExpression::literal("a").into(),
                    Alternative::new(ParsingExpression::literal("b")).with_action("make_b"),
                ]),
            )),
            SequencePart::new(ParsingExpression::repeat(
                ParsingExpression::AnyChar,
                2,
                Some(4),
            )),
            SequencePart::new(ParsingExpression::lookahead(
                ParsingExpression::literal("z"),
                Polarity::Negative,
            )),
        ]);
        assert_eq!(
            expr.to_string(),
            r#"k:key @":" ("a" / "b" %make_b)* .{2,4} !"z""#
        );
    }

    #[test]
    fn rendering_escapes_delimiters_and_controls() {
        assert_eq!(
            ParsingExpression::literal("a\"b\\\n").to_string(),
            r#""a\"b\\\n""#
        );
        assert_eq!(
            ParsingExpression::class(false, vec![ClassItem::Char('-'), ClassItem::Char('\u{1}')])
                .to_string(),
            r"[\-\u{1}]"
        );
    }

    #[test]
    fn references_are_visited_through_every_operator() {
        let expr = ParsingExpression::choice(vec![
            ParsingExpression::optional(ParsingExpression::reference("a")).into(),
            ParsingExpression::sequence(vec![
                ParsingExpression::lookahead(ParsingExpression::reference("b"), Polarity::Positive)
                    .into(),
                ParsingExpression::one_or_more(ParsingExpression::reference("c")).into(),
            ])
            .into(),
        ]);
        let mut seen = Vec::new();
        expr.for_each_reference(&mut |name| seen.push(name));
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
