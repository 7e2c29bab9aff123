//! Property-based tests for the matcher over generated inputs.

use packrat_core::{compile, ActionError, Grammar, NodeRef, Parser};
use proptest::prelude::*;

/// Balanced parentheses around `a` atoms.
fn nesting() -> Grammar {
    compile(
        "doc  <- item*\n\
         item <- \"(\" doc \")\" %group / \"a\" %leaf\n",
    )
    .unwrap()
}

fn balanced(input: &str) -> bool {
    let mut depth: i64 = 0;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Run a parse, recording every action invocation.
fn traced(g: &Grammar, input: &str) -> (Result<String, String>, Vec<(String, usize)>) {
    let mut calls = Vec::new();
    let result = {
        let mut actions = |name: &str,
                           _: &str,
                           offset: usize,
                           _: &[NodeRef]|
         -> Result<Option<NodeRef>, ActionError> {
            calls.push((name.to_string(), offset));
            Ok(None)
        };
        Parser::new(g)
            .with_actions(&mut actions)
            .parse(input)
            .map(|node| format!("{:?}", node))
            .map_err(|e| e.to_string())
    };
    (result, calls)
}

proptest! {
    #[test]
    fn accepts_exactly_the_balanced_inputs(input in "[()a]{0,24}") {
        let g = nesting();
        prop_assert_eq!(g.parse(&input).is_ok(), balanced(&input));
    }

    #[test]
    fn parsing_is_deterministic(input in "[()a]{0,24}") {
        let g = nesting();
        let (first, first_calls) = traced(&g, &input);
        let (second, second_calls) = traced(&g, &input);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_calls, second_calls);
    }

    #[test]
    fn each_match_runs_its_action_once(input in "[()a]{0,24}") {
        let g = nesting();
        let (_, calls) = traced(&g, &input);
        let mut seen = calls.clone();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), calls.len());
    }

    #[test]
    fn failures_point_inside_the_input(input in "[()a]{0,24}") {
        let g = nesting();
        match g.parse(&input) {
            Ok(node) => prop_assert_eq!(node.text(), input.as_str()),
            Err(e) => {
                let err = e.as_parse_error().cloned();
                prop_assert!(err.is_some());
                let err = err.unwrap();
                prop_assert!(err.offset <= input.chars().count());
                prop_assert_eq!(err.line, 1);
                prop_assert_eq!(err.column, err.offset + 1);
                prop_assert!(!err.expected.is_empty());
            }
        }
    }
}
