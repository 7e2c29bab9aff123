//! Raw PEG-language syntax tree → rule table.
//!
//! The meta-grammar tags every construct with a node type (`Rule`,
//! `Choice`, `SequencePart`, `Range`, ...) and labels the pieces each
//! construct needs, so this module dispatches on `node_type()` and reads
//! children through `field()`. Literal and class bodies are decoded here,
//! where escape errors can name the rule they occur in.

use std::str::Chars;

use crate::ast::{Alternative, ClassItem, ParsingExpression, Polarity, SequencePart, Shorthand};
use crate::error::CompileError;
use crate::grammar::Rule;
use crate::node::NodeRef;

type Expr = ParsingExpression;

/// Read the tree produced by the meta-grammar's root rule.
pub(super) fn grammar(tree: &NodeRef) -> Result<(Option<String>, Vec<Rule>), CompileError> {
    let name = field(tree, "header")?
        .field("object_identifier")
        .map(|id| id.text().to_string());

    let mut rules = Vec::new();
    for item in field(tree, "rules")?.children() {
        rules.push(rule(field(item, "grammar_rule")?)?);
    }
    Ok((name, rules))
}

fn rule(node: &NodeRef) -> Result<Rule, CompileError> {
    let name = field(node, "identifier")?.text().to_string();
    let expr = expression(field(node, "parsing_expression")?, &name)?;
    // A rule whose whole body is one tagged alternative carries the tags
    // itself.
    Ok(match expr {
        Expr::Choice { alternatives } => match <[Alternative; 1]>::try_from(alternatives) {
            Ok([alt]) => Rule::from_alternative(name, alt),
            Err(alternatives) => Rule::new(name, Expr::Choice { alternatives }),
        },
        expr => Rule::new(name, expr),
    })
}

fn expression(node: &NodeRef, rule: &str) -> Result<Expr, CompileError> {
    match node.node_type() {
        Some("Choice") => {
            let mut alternatives = vec![alternative(field(node, "first")?, rule)?];
            for item in field(node, "rest")?.children() {
                alternatives.push(alternative(field(item, "choice_part")?, rule)?);
            }
            Ok(Expr::Choice { alternatives })
        }
        Some("ChoicePart") => {
            let alt = alternative(node, rule)?;
            if alt.is_tagged() {
                Ok(Expr::choice(vec![alt]))
            } else {
                Ok(alt.expression)
            }
        }
        _ => Err(unexpected(node)),
    }
}

fn alternative(node: &NodeRef, rule: &str) -> Result<Alternative, CompileError> {
    let body = field(node, "body")?;
    let mut alt = if body.node_type() == Some("Action") {
        let action = field(field(body, "action_tag")?, "identifier")?.text();
        Alternative::new(sequence(field(body, "expression")?, rule)?).with_action(action)
    } else {
        Alternative::new(sequence(body, rule)?)
    };
    if let Some(tag) = field(node, "tag")?.field("type_tag") {
        alt = alt.with_type(field(tag, "object_identifier")?.text());
    }
    Ok(alt)
}

fn sequence(node: &NodeRef, rule: &str) -> Result<Expr, CompileError> {
    match node.node_type() {
        Some("Sequence") => {
            let mut parts = vec![part(field(node, "first")?, rule)?];
            for item in field(node, "rest")?.children() {
                parts.push(part(field(item, "sequence_part")?, rule)?);
            }
            Ok(Expr::Sequence { parts })
        }
        Some("SequencePart") => {
            let part = part(node, rule)?;
            // A lone part keeps its sequence only to hold a label or mute.
            if part.label.is_some() || part.muted {
                Ok(Expr::sequence(vec![part]))
            } else {
                Ok(part.expression)
            }
        }
        _ => Err(unexpected(node)),
    }
}

fn part(node: &NodeRef, rule: &str) -> Result<SequencePart, CompileError> {
    Ok(SequencePart {
        muted: field(node, "mute")?.text() == "@",
        label: field(node, "label")?
            .field("identifier")
            .map(|id| id.text().to_string()),
        expression: atom(field(node, "expression")?, rule)?,
    })
}

fn atom(node: &NodeRef, rule: &str) -> Result<Expr, CompileError> {
    match node.node_type() {
        Some("Maybe") => Ok(Expr::optional(atom(field(node, "atom")?, rule)?)),
        Some("Repeat") => {
            let operand = atom(field(node, "atom")?, rule)?;
            let quantifier = field(node, "quantifier")?;
            let (min, max) = match quantifier.text() {
                "*" => (0, None),
                "+" => (1, None),
                _ => range(quantifier)?,
            };
            Ok(Expr::repeat(operand, min, max))
        }
        Some("Paren") => expression(field(node, "parsing_expression")?, rule),
        Some("Lookahead") => {
            let polarity = if field(node, "predicate")?.text() == "&" {
                Polarity::Positive
            } else {
                Polarity::Negative
            };
            Ok(Expr::lookahead(atom(field(node, "atom")?, rule)?, polarity))
        }
        Some("Reference") => Ok(Expr::reference(field(node, "identifier")?.text())),
        Some("String") => Ok(Expr::literal(unescape(unquote(node.text()), rule)?)),
        Some("CiString") => Ok(Expr::literal_ci(unescape(unquote(node.text()), rule)?)),
        Some("CharClass") => char_class(node.text(), rule),
        Some("AnyChar") => Ok(Expr::AnyChar),
        _ => Err(unexpected(node)),
    }
}

/// `{n}`, `{n,}` or `{n,m}`.
fn range(node: &NodeRef) -> Result<(usize, Option<usize>), CompileError> {
    let min = integer(field(node, "min")?.text());
    let max = field(node, "max")?;
    if max.text().is_empty() {
        return Ok((min, Some(min)));
    }
    let upper = field(max, "upper")?.text();
    if upper.is_empty() {
        Ok((min, None))
    } else {
        Ok((min, Some(integer(upper))))
    }
}

/// Digits only; anything too large for `usize` saturates.
fn integer(text: &str) -> usize {
    text.parse().unwrap_or(usize::MAX)
}

// ──────────────────────────────────────────────
// Escapes
// ──────────────────────────────────────────────

/// Strip the delimiter from both ends.
fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

fn unescape(text: &str, rule: &str) -> Result<String, CompileError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(escape(&mut chars, rule)?);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Decode the escape following a backslash.
fn escape(chars: &mut Chars<'_>, rule: &str) -> Result<char, CompileError> {
    let invalid = |sequence: String| CompileError::InvalidEscape {
        rule: rule.to_string(),
        sequence,
    };
    let c = chars.next().ok_or_else(|| invalid("\\".to_string()))?;
    Ok(match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'f' => '\u{c}',
        'v' => '\u{b}',
        'b' => '\u{8}',
        '0' => '\0',
        'u' => return unicode_escape(chars).map_err(invalid),
        other => other,
    })
}

/// `XXXX` or `{X..}` after `\u`.
fn unicode_escape(chars: &mut Chars<'_>) -> Result<char, String> {
    let rest = chars.as_str();
    let (digits, consumed, braced, sequence) = match rest.strip_prefix('{') {
        Some(inner) => {
            let end = inner
                .find('}')
                .ok_or_else(|| format!("\\u{}", rest))?;
            let digits = &inner[..end];
            (digits, end + 2, true, format!("\\u{{{}}}", digits))
        }
        None => {
            let digits = rest.get(..4).unwrap_or(rest);
            (digits, 4, false, format!("\\u{}", digits))
        }
    };
    let valid_len = if braced {
        (1..=6).contains(&digits.len())
    } else {
        digits.len() == 4
    };
    if !valid_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(sequence);
    }
    let c = u32::from_str_radix(digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| sequence.clone())?;
    *chars = rest[consumed..].chars();
    Ok(c)
}

// ──────────────────────────────────────────────
// Character classes
// ──────────────────────────────────────────────

#[derive(Clone, Copy)]
enum ClassToken {
    Char(char),
    Dash,
    Shorthand(Shorthand),
}

fn char_class(text: &str, rule: &str) -> Result<Expr, CompileError> {
    let body = unquote(text);
    let (negate, body) = match body.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut tokens = Vec::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '-' => ClassToken::Dash,
            '\\' => match chars.clone().next().and_then(Shorthand::from_escape) {
                Some(shorthand) => {
                    chars.next();
                    ClassToken::Shorthand(shorthand)
                }
                None => ClassToken::Char(escape(&mut chars, rule)?),
            },
            c => ClassToken::Char(c),
        };
        tokens.push(token);
    }

    let mut items = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match (tokens[i], tokens.get(i + 1), tokens.get(i + 2)) {
            (ClassToken::Char(from), Some(ClassToken::Dash), Some(&ClassToken::Char(to))) => {
                if from > to {
                    return Err(CompileError::InvalidClassRange {
                        rule: rule.to_string(),
                        from,
                        to,
                    });
                }
                items.push(ClassItem::Range(from, to));
                i += 3;
                continue;
            }
            (ClassToken::Char(c), ..) => items.push(ClassItem::Char(c)),
            (ClassToken::Dash, ..) => items.push(ClassItem::Char('-')),
            (ClassToken::Shorthand(s), ..) => items.push(ClassItem::Shorthand(s)),
        }
        i += 1;
    }
    Ok(Expr::class(negate, items))
}

// ──────────────────────────────────────────────
// Tree access
// ──────────────────────────────────────────────

fn field<'n>(node: &'n NodeRef, label: &str) -> Result<&'n NodeRef, CompileError> {
    node.field(label).ok_or_else(|| {
        CompileError::Loader(format!(
            "{} node at offset {} has no '{}'",
            node.node_type().unwrap_or("untyped"),
            node.offset(),
            label
        ))
    })
}

fn unexpected(node: &NodeRef) -> CompileError {
    CompileError::Loader(format!(
        "unexpected {} node at offset {}",
        node.node_type().unwrap_or("untyped"),
        node.offset()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_decode() {
        assert_eq!(unescape(r#"a\n\t\"\\A\u{1F600}\q"#, "r").unwrap(), "a\n\t\"\\A😀q");
    }

    #[test]
    fn short_braced_escapes_decode() {
        assert_eq!(unescape(r"\u{41}\u{1b}\u{7f}", "r").unwrap(), "A\u{1b}\u{7f}");
        assert_eq!(unescape(r"\u{9}\u0041", "r").unwrap(), "\tA");
    }

    #[test]
    fn malformed_escapes_name_the_rule() {
        let err = unescape(r"\u12", "word").unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidEscape {
                rule: "word".into(),
                sequence: r"\u12".into()
            }
        );
        assert!(unescape(r"\u{110000}", "word").is_err());
        assert!(unescape(r"\u{41", "word").is_err());
    }

    #[test]
    fn classes_decode_ranges_shorthands_and_dashes() {
        let expr = char_class(r"[^a-z\d_\-\]-]", "r").unwrap();
        assert_eq!(
            expr,
            Expr::class(
                true,
                vec![
                    ClassItem::Range('a', 'z'),
                    ClassItem::Shorthand(Shorthand::Digit),
                    ClassItem::Char('_'),
                    ClassItem::Char('-'),
                    ClassItem::Char(']'),
                    ClassItem::Char('-'),
                ]
            )
        );
    }

    #[test]
    fn reversed_class_range_is_rejected() {
        assert_eq!(
            char_class("[z-a]", "r").unwrap_err(),
            CompileError::InvalidClassRange {
                rule: "r".into(),
                from: 'z',
                to: 'a'
            }
        );
    }
}
