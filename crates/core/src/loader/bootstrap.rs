//! The PEG language's own rule table, written out by hand.
//!
//! This is the fixed point of the loader: compiling `grammars/peg.peg` with
//! this table must yield this table again. Any edit here needs the same
//! edit in the `.peg` file, and the other way round.

use crate::ast::{Alternative, ClassItem, ParsingExpression, SequencePart, Shorthand};
use crate::error::CompileError;
use crate::grammar::{Grammar, Rule};

type Expr = ParsingExpression;

fn lit(text: &str) -> Expr {
    Expr::literal(text)
}

fn r(rule: &str) -> Expr {
    Expr::reference(rule)
}

fn seq(parts: Vec<SequencePart>) -> Expr {
    Expr::sequence(parts)
}

fn choice(alternatives: Vec<Expr>) -> Expr {
    Expr::choice(alternatives.into_iter().map(Alternative::new).collect())
}

fn part(expr: Expr) -> SequencePart {
    SequencePart::new(expr)
}

fn label(name: &str, expr: Expr) -> SequencePart {
    SequencePart::labeled(name, expr)
}

fn star(expr: Expr) -> Expr {
    Expr::zero_or_more(expr)
}

fn plus(expr: Expr) -> Expr {
    Expr::one_or_more(expr)
}

fn opt(expr: Expr) -> Expr {
    Expr::optional(expr)
}

fn ws() -> Expr {
    star(r("__"))
}

fn ws1() -> Expr {
    plus(r("__"))
}

/// `("\\" . / [^<delimiter>])`
fn escaped_or_not(delimiter: char) -> Expr {
    choice(vec![
        seq(vec![part(lit("\\")), part(Expr::AnyChar)]),
        Expr::class(true, vec![ClassItem::Char(delimiter)]),
    ])
}

fn quoted(quote: char) -> Expr {
    let q = quote.to_string();
    seq(vec![
        part(lit(&q)),
        part(star(escaped_or_not(quote))),
        part(lit(&q)),
    ])
}

fn typed(name: &str, node_type: &str, expr: Expr) -> Rule {
    Rule::new(name, expr).with_type(node_type)
}

/// Build the PEG-language grammar.
pub fn grammar() -> Result<Grammar, CompileError> {
    let rules = vec![
        typed(
            "grammar",
            "Grammar",
            seq(vec![
                part(ws()),
                label("header", opt(r("grammar_name"))),
                label("rules", plus(seq(vec![part(ws()), part(r("grammar_rule"))]))),
                part(ws()),
            ]),
        ),
        typed(
            "grammar_name",
            "GrammarName",
            seq(vec![
                part(Expr::literal_ci("grammar")),
                part(opt(lit(":"))),
                part(ws1()),
                part(r("object_identifier")),
            ]),
        ),
        typed(
            "grammar_rule",
            "Rule",
            seq(vec![
                part(r("identifier")),
                part(r("assignment")),
                part(r("parsing_expression")),
            ]),
        ),
        Rule::new(
            "assignment",
            seq(vec![part(ws1()), part(lit("<-")), part(ws1())]),
        ),
        Rule::new(
            "parsing_expression",
            choice(vec![r("choice_expression"), r("choice_part")]),
        ),
        typed(
            "parenthesised_expression",
            "Paren",
            seq(vec![
                part(lit("(")),
                part(ws()),
                part(r("parsing_expression")),
                part(ws()),
                part(lit(")")),
            ]),
        ),
        typed(
            "choice_expression",
            "Choice",
            seq(vec![
                label("first", r("choice_part")),
                label(
                    "rest",
                    plus(seq(vec![
                        part(ws()),
                        part(lit("/")),
                        part(ws()),
                        part(r("choice_part")),
                    ])),
                ),
            ]),
        ),
        typed(
            "choice_part",
            "ChoicePart",
            seq(vec![
                label(
                    "body",
                    choice(vec![
                        r("action_expression"),
                        r("sequence_expression"),
                        r("sequence_part"),
                    ]),
                ),
                label("tag", opt(seq(vec![part(ws1()), part(r("type_tag"))]))),
            ]),
        ),
        typed(
            "action_expression",
            "Action",
            seq(vec![
                label(
                    "expression",
                    choice(vec![r("sequence_expression"), r("sequence_part")]),
                ),
                part(ws1()),
                part(r("action_tag")),
            ]),
        ),
        Rule::new(
            "action_tag",
            seq(vec![part(lit("%")), part(r("identifier"))]),
        ),
        Rule::new(
            "type_tag",
            seq(vec![
                part(lit("<")),
                part(r("object_identifier")),
                part(lit(">")),
            ]),
        ),
        typed(
            "sequence_expression",
            "Sequence",
            seq(vec![
                label("first", r("sequence_part")),
                label(
                    "rest",
                    plus(seq(vec![part(ws1()), part(r("sequence_part"))])),
                ),
            ]),
        ),
        typed(
            "sequence_part",
            "SequencePart",
            seq(vec![
                label("mute", opt(lit("@"))),
                label(
                    "label",
                    opt(seq(vec![part(r("identifier")), part(lit(":"))])),
                ),
                label(
                    "expression",
                    choice(vec![r("maybe_atom"), r("repeated_atom"), r("atom")]),
                ),
            ]),
        ),
        typed(
            "maybe_atom",
            "Maybe",
            seq(vec![part(r("atom")), part(lit("?"))]),
        ),
        typed(
            "repeated_atom",
            "Repeat",
            seq(vec![
                part(r("atom")),
                label(
                    "quantifier",
                    choice(vec![lit("*"), lit("+"), r("repeat_range")]),
                ),
            ]),
        ),
        typed(
            "repeat_range",
            "Range",
            seq(vec![
                part(lit("{")),
                part(ws()),
                label("min", r("integer")),
                label(
                    "max",
                    opt(seq(vec![
                        part(ws()),
                        part(lit(",")),
                        part(ws()),
                        label("upper", opt(r("integer"))),
                    ])),
                ),
                part(ws()),
                part(lit("}")),
            ]),
        ),
        Rule::new(
            "atom",
            choice(vec![
                r("parenthesised_expression"),
                r("predicated_atom"),
                r("reference_expression"),
                r("terminal_node"),
            ]),
        ),
        typed(
            "predicated_atom",
            "Lookahead",
            seq(vec![
                label("predicate", choice(vec![lit("&"), lit("!")])),
                part(r("atom")),
            ]),
        ),
        typed(
            "reference_expression",
            "Reference",
            seq(vec![
                part(r("identifier")),
                part(Expr::lookahead(
                    r("assignment"),
                    crate::ast::Polarity::Negative,
                )),
            ]),
        ),
        Rule::new(
            "terminal_node",
            choice(vec![
                r("string_expression"),
                r("ci_string_expression"),
                r("char_class_expression"),
                r("any_char_expression"),
            ]),
        ),
        Rule::new(
            "string_expression",
            Expr::choice(vec![
                Alternative::new(quoted('"')).with_type("String"),
                Alternative::new(quoted('\'')).with_type("String"),
            ]),
        ),
        typed("ci_string_expression", "CiString", quoted('`')),
        typed(
            "char_class_expression",
            "CharClass",
            seq(vec![
                part(lit("[")),
                part(opt(lit("^"))),
                part(plus(escaped_or_not(']'))),
                part(lit("]")),
            ]),
        ),
        typed("any_char_expression", "AnyChar", lit(".")),
        Rule::new(
            "object_identifier",
            seq(vec![
                part(r("identifier")),
                part(star(seq(vec![part(lit(".")), part(r("identifier"))]))),
            ]),
        ),
        Rule::new(
            "identifier",
            seq(vec![
                part(Expr::class(
                    false,
                    vec![
                        ClassItem::Range('a', 'z'),
                        ClassItem::Range('A', 'Z'),
                        ClassItem::Char('_'),
                    ],
                )),
                part(star(Expr::class(
                    false,
                    vec![
                        ClassItem::Range('a', 'z'),
                        ClassItem::Range('A', 'Z'),
                        ClassItem::Range('0', '9'),
                        ClassItem::Char('_'),
                    ],
                ))),
            ]),
        ),
        Rule::new(
            "integer",
            plus(Expr::class(false, vec![ClassItem::Range('0', '9')])),
        ),
        Rule::new(
            "__",
            choice(vec![
                Expr::class(false, vec![ClassItem::Shorthand(Shorthand::Space)]),
                r("comment"),
            ]),
        ),
        Rule::new(
            "comment",
            seq(vec![
                part(lit("#")),
                part(star(Expr::class(true, vec![ClassItem::Char('\n')]))),
            ]),
        ),
    ];

    Grammar::new(Some("PEG".to_string()), rules)
}
