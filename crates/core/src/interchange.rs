//! Grammar interchange JSON.
//!
//! A compiled rule table serialises to a small versioned document so an
//! external code emitter can consume it without re-parsing `.peg` source:
//!
//! ```json
//! { "format": "packrat-grammar", "version": "1.0.0",
//!   "grammar": { "name": "Calc", "rules": [ { "name": "expr", "expression": { "kind": "choice", ... } } ] } }
//! ```
//!
//! Loading a document re-runs full grammar validation, so a hand-edited
//! document never yields a partially consistent grammar.

use crate::error::InterchangeError;
use crate::grammar::{Grammar, Rule};
use serde::Deserialize;

pub const FORMAT: &str = "packrat-grammar";
pub const VERSION: &str = "1.0.0";

/// Serialise `grammar` into an interchange document.
pub fn to_interchange(grammar: &Grammar) -> serde_json::Value {
    serde_json::json!({
        "format": FORMAT,
        "version": VERSION,
        "grammar": grammar,
    })
}

#[derive(Deserialize)]
struct GrammarDocument {
    #[serde(default)]
    name: Option<String>,
    rules: Vec<Rule>,
}

/// Load a grammar from an interchange document.
pub fn from_interchange(document: &serde_json::Value) -> Result<Grammar, InterchangeError> {
    let format = required_str(document, "format")?;
    if format != FORMAT {
        return Err(InterchangeError::Format {
            expected: FORMAT.to_string(),
            found: format.to_string(),
        });
    }

    let version = required_str(document, "version")?;
    if version != VERSION {
        return Err(InterchangeError::Version {
            expected: VERSION.to_string(),
            found: version.to_string(),
        });
    }

    let body = document
        .get("grammar")
        .ok_or_else(|| InterchangeError::MissingField {
            field: "grammar".to_string(),
        })?;
    let GrammarDocument { name, rules } = GrammarDocument::deserialize(body)?;
    Ok(Grammar::new(name, rules)?)
}

fn required_str<'a>(
    document: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, InterchangeError> {
    document
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| InterchangeError::MissingField {
            field: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use serde_json::json;

    fn sample() -> Grammar {
        Grammar::compile(
            "grammar Sample\n\
             list <- \"[\" items:(item (@\",\" item)*)? \"]\" %make_list <List>\n\
             item <- [a-z0-9]+ / `nil`\n",
        )
        .unwrap()
    }

    #[test]
    fn document_carries_format_and_tagged_expressions() {
        let doc = to_interchange(&sample());
        assert_eq!(doc["format"], json!("packrat-grammar"));
        assert_eq!(doc["version"], json!("1.0.0"));
        assert_eq!(doc["grammar"]["name"], json!("Sample"));
        let list = &doc["grammar"]["rules"][0];
        assert_eq!(list["name"], json!("list"));
        assert_eq!(list["action"], json!("make_list"));
        assert_eq!(list["node_type"], json!("List"));
        assert_eq!(list["expression"]["kind"], json!("sequence"));
        let item = &doc["grammar"]["rules"][1];
        assert_eq!(item["expression"]["kind"], json!("choice"));
        assert_eq!(
            item["expression"]["alternatives"][1]["expression"],
            json!({ "kind": "literal", "text": "nil", "case_sensitive": false })
        );
    }

    #[test]
    fn document_loads_back_to_an_equal_grammar() {
        let grammar = sample();
        let loaded = from_interchange(&to_interchange(&grammar)).unwrap();
        assert_eq!(loaded, grammar);
        assert_eq!(loaded.rule_index("item"), Some(1));
    }

    #[test]
    fn wrong_format_or_version_rejected() {
        let mut doc = to_interchange(&sample());
        doc["version"] = json!("2.0.0");
        assert!(matches!(
            from_interchange(&doc),
            Err(InterchangeError::Version { .. })
        ));
        doc["format"] = json!("something-else");
        assert!(matches!(
            from_interchange(&doc),
            Err(InterchangeError::Format { .. })
        ));
        assert!(matches!(
            from_interchange(&json!({ "version": "1.0.0" })),
            Err(InterchangeError::MissingField { .. })
        ));
    }

    #[test]
    fn tampered_document_fails_validation() {
        let mut doc = to_interchange(&sample());
        doc["grammar"]["rules"][1]["name"] = json!("list");
        match from_interchange(&doc) {
            Err(InterchangeError::Compile(CompileError::DuplicateRule { name })) => {
                assert_eq!(name, "list")
            }
            other => panic!("expected duplicate rule error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_expression_is_a_json_error() {
        let mut doc = to_interchange(&sample());
        doc["grammar"]["rules"][1]["expression"] = json!({ "kind": "telepathy" });
        assert!(matches!(
            from_interchange(&doc),
            Err(InterchangeError::Json(_))
        ));
    }
}
