//! `.peg` source → [`Grammar`].
//!
//! The source is parsed by the matcher itself, running the hard-coded
//! PEG-language grammar from [`bootstrap`]; the resulting tree is turned
//! into a rule table by `transform` and validated by [`Grammar::new`].

pub mod bootstrap;
mod transform;

use crate::error::{CompileError, MatchError};
use crate::grammar::Grammar;

/// The PEG language's definition, in its own syntax.
pub const PEG_GRAMMAR: &str = include_str!("../../grammars/peg.peg");

/// Compile `.peg` source text into a grammar.
pub fn compile(source: &str) -> Result<Grammar, CompileError> {
    let meta = bootstrap::grammar()?;
    let tree = meta.parse(source).map_err(|e| match e {
        MatchError::Parse(err) => CompileError::Syntax(err),
        other => CompileError::Loader(other.to_string()),
    })?;
    let (name, rules) = transform::grammar(&tree)?;
    Grammar::new(name, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Alternative, ParsingExpression, Polarity, SequencePart};
    use crate::grammar::Rule;

    fn rules_of(source: &str) -> Vec<Rule> {
        compile(source).unwrap().rules().to_vec()
    }

    #[test]
    fn self_hosting_reaches_the_fixed_point() {
        let compiled = compile(PEG_GRAMMAR).unwrap();
        let bootstrap = bootstrap::grammar().unwrap();
        assert_eq!(compiled, bootstrap);
        assert_eq!(compiled.name(), Some("PEG"));
    }

    #[test]
    fn header_is_optional() {
        let g = compile("greeting <- \"hi\"").unwrap();
        assert_eq!(g.name(), None);
        let g = compile("grammar: Demo.Greeting\n\ngreeting <- \"hi\"\n").unwrap();
        assert_eq!(g.name(), Some("Demo.Greeting"));
    }

    #[test]
    fn rules_may_span_lines_and_carry_comments() {
        let rules = rules_of(
            "# leading comment\n\
             list <- \"(\" item\n        (\",\" item)* \")\"   # trailing\n\
             item <- [0-9]+\n",
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].name, "item");
    }

    #[test]
    fn tags_on_a_lone_alternative_lift_onto_the_rule() {
        let rules = rules_of("num <- [0-9]+ %make_num <Num>");
        assert_eq!(rules[0].action.as_deref(), Some("make_num"));
        assert_eq!(rules[0].node_type.as_deref(), Some("Num"));
    }

    #[test]
    fn tags_bind_to_their_own_alternative() {
        let rules = rules_of("r <- \"a\" \"b\" %ab / \"c\" <C> / \"d\"");
        assert_eq!(
            rules[0].expression,
            ParsingExpression::choice(vec![
                Alternative::new(ParsingExpression::sequence(vec![
                    ParsingExpression::literal("a").into(),
                    ParsingExpression::literal("b").into(),
                ]))
                .with_action("ab"),
                Alternative::new(ParsingExpression::literal("c")).with_type("C"),
                ParsingExpression::literal("d").into(),
            ])
        );
    }

    #[test]
    fn labels_mutes_and_quantifiers() {
        let rules = rules_of("r <- k:key @\":\" v:value{2,} &x !y\nkey <- \"k\"\nvalue <- \"v\"\nx <- \"x\"\ny <- \"y\"");
        assert_eq!(
            rules[0].expression,
            ParsingExpression::sequence(vec![
                SequencePart::labeled("k", ParsingExpression::reference("key")),
                SequencePart::new(ParsingExpression::literal(":")).muted(),
                SequencePart::labeled(
                    "v",
                    ParsingExpression::repeat(ParsingExpression::reference("value"), 2, None)
                ),
                ParsingExpression::lookahead(
                    ParsingExpression::reference("x"),
                    Polarity::Positive
                )
                .into(),
                ParsingExpression::lookahead(
                    ParsingExpression::reference("y"),
                    Polarity::Negative
                )
                .into(),
            ])
        );
    }

    #[test]
    fn lone_labelled_part_keeps_its_sequence() {
        let rules = rules_of("r <- n:\"1\"");
        assert_eq!(
            rules[0].expression,
            ParsingExpression::sequence(vec![SequencePart::labeled(
                "n",
                ParsingExpression::literal("1")
            )])
        );
    }

    #[test]
    fn repeat_range_forms() {
        let rules = rules_of("r <- \"a\"{3} \"b\"{ 1 , 4 } \"c\"{0,}");
        let ParsingExpression::Sequence { parts } = &rules[0].expression else {
            panic!("expected a sequence");
        };
        let bounds: Vec<_> = parts
            .iter()
            .map(|p| match &p.expression {
                ParsingExpression::Repeat { min, max, .. } => (*min, *max),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(bounds, vec![(3, Some(3)), (1, Some(4)), (0, None)]);
    }

    #[test]
    fn syntax_errors_carry_diagnostics() {
        let err = compile("r <- \"a\"\nbroken <- (\"b\"\n").unwrap_err();
        let CompileError::Syntax(err) = err else {
            panic!("expected a syntax error, got {:?}", err);
        };
        assert_eq!(err.line, 3);
        assert!(err.message.starts_with("parse error at line 3"));
    }

    #[test]
    fn undefined_reference_is_a_compile_error() {
        assert_eq!(
            compile("r <- missing").unwrap_err(),
            CompileError::UndefinedRule {
                rule: "r".into(),
                reference: "missing".into()
            }
        );
    }

    #[test]
    fn empty_source_is_a_syntax_error() {
        assert!(matches!(compile("  # nothing\n"), Err(CompileError::Syntax(_))));
    }
}
