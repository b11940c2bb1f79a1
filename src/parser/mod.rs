/// Gremlin script parser
///
/// This module parses the textual form of a traversal using the pest library
/// and produces the same step list the builder API records.

mod builder;

use crate::traversal::Traversal;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "parser/gremlin.pest"]
pub struct GremlinParser;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Pest parsing error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// How a script's results are materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `next()`: exactly one result
    Next,
    /// `toList()`, also used when a script names no terminal
    ToList,
    /// `iterate()`: run for side effects only
    Iterate,
}

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Name of the traversal source the script starts from (usually `g`)
    pub source: String,
    /// Unbound traversal; bind it to a source before running it
    pub traversal: Traversal,
    pub terminal: Terminal,
}

/// Parse a Gremlin script
///
/// # Arguments
/// * `input` - The script, e.g. `g.V().hasLabel('person').toList()`
///
/// # Returns
/// * `Ok(Script)` - Source name, traversal and terminal
/// * `Err(ParseError)` - Parse error
///
/// # Examples
/// ```
/// use gremlin_graph_db::parser::{parse_gremlin, Terminal};
///
/// let script = parse_gremlin("g.V().hasLabel('person').valueMap(true)").unwrap();
/// assert_eq!(script.source, "g");
/// assert_eq!(script.terminal, Terminal::ToList);
/// ```
pub fn parse_gremlin(input: &str) -> ParseResult<Script> {
    let pairs = GremlinParser::parse(Rule::script, input)
        .map_err(|e| ParseError::PestError(Box::new(e)))?;

    builder::build_script(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::{Direction, Step, __};
    use serde_json::json;

    #[test]
    fn test_parse_read_query() {
        let script = parse_gremlin("g.V().hasLabel('person').valueMap(true).toList()").unwrap();

        assert_eq!(script.source, "g");
        assert_eq!(script.terminal, Terminal::ToList);
        assert_eq!(
            script.traversal.steps(),
            &[
                Step::V(vec![]),
                Step::HasLabel(vec!["person".into()]),
                Step::ValueMap {
                    include_tokens: true,
                    keys: vec![]
                },
            ]
        );
    }

    #[test]
    fn test_parse_add_vertex_folds_properties() {
        let script =
            parse_gremlin("g.addV('person').property('id', '1').property('name', 'Alice').next()")
                .unwrap();

        assert_eq!(script.terminal, Terminal::Next);
        assert_eq!(
            script.traversal.steps(),
            &[Step::AddV {
                label: "person".into(),
                id: Some("1".into()),
                properties: vec![("name".into(), json!("Alice"))],
            }]
        );
    }

    #[test]
    fn test_parse_add_edge_with_nested_target() {
        let script = parse_gremlin(
            "g.V('1').addE('knows').to(g.V('2')).property('since', 2023).next()",
        )
        .unwrap();

        let expected = Traversal::anonymous()
            .v("1")
            .add_e("knows")
            .to(__::v("2"))
            .property("since", 2023);
        assert_eq!(script.traversal, expected);
    }

    #[test]
    fn test_parse_edge_start_matches_builder() {
        let script = parse_gremlin("g.E('7').outV().V().E()").unwrap();

        let expected = Traversal::anonymous().e("7").out_v().v(()).e(());
        assert_eq!(script.traversal, expected);
    }

    #[test]
    fn test_parse_python_spellings() {
        let script = parse_gremlin(
            "g.addE(\"knows\").from_(__.V(\"1\")).to(__.V(\"2\")).property(T.id, \"e1\").iterate()",
        )
        .unwrap();

        assert_eq!(script.terminal, Terminal::Iterate);
        match &script.traversal.steps()[0] {
            Step::AddE { id, from, to, .. } => {
                assert_eq!(id.as_deref(), Some("e1"));
                assert!(from.is_some() && to.is_some());
            }
            other => panic!("unexpected step {:?}", other),
        }

        let script = parse_gremlin("g.V().in_('knows').valueMap(True)").unwrap();
        assert_eq!(
            script.traversal.steps()[1],
            Step::Vertices {
                direction: Direction::In,
                labels: vec!["knows".into()]
            }
        );
    }

    #[test]
    fn test_parse_scalar_arguments() {
        let script =
            parse_gremlin("g.V().has('score', -1.5).has('age', 30).has('ok', false).limit(2)")
                .unwrap();
        let steps = script.traversal.steps();

        assert_eq!(
            steps[1],
            Step::Has {
                key: "score".into(),
                value: Some(json!(-1.5))
            }
        );
        assert_eq!(
            steps[2],
            Step::Has {
                key: "age".into(),
                value: Some(json!(30))
            }
        );
        assert_eq!(
            steps[3],
            Step::Has {
                key: "ok".into(),
                value: Some(json!(false))
            }
        );
        assert_eq!(steps[4], Step::Limit(2));
    }

    #[test]
    fn test_parse_escaped_strings() {
        let script = parse_gremlin(r#"g.V().has('name', 'O\'Brien')"#).unwrap();

        assert_eq!(
            script.traversal.steps()[1],
            Step::Has {
                key: "name".into(),
                value: Some(json!("O'Brien"))
            }
        );
    }

    #[test]
    fn test_display_output_parses_back() {
        let built = Traversal::anonymous()
            .v("1")
            .add_e("knows")
            .to(__::v("2"))
            .property("id", "e1")
            .property("since", 2023)
            .value_map_keys(true, "since");

        let text = format!("g{}", &built.to_string()["__".len()..]);
        let parsed = parse_gremlin(&text).unwrap();
        assert_eq!(parsed.traversal, built);
    }

    #[test]
    fn test_parse_invalid_scripts() {
        assert!(matches!(
            parse_gremlin("g.V(").unwrap_err(),
            ParseError::PestError(_)
        ));
        assert!(matches!(
            parse_gremlin("g.V().next().count()").unwrap_err(),
            ParseError::InvalidSyntax(_)
        ));
        assert!(matches!(
            parse_gremlin("g.V().repeat(__.out())").unwrap_err(),
            ParseError::UnsupportedFeature(_)
        ));
        assert!(matches!(
            parse_gremlin("g.V().limit('x')").unwrap_err(),
            ParseError::InvalidSyntax(_)
        ));
        assert!(matches!(
            parse_gremlin("g.V().to(x.V('2'))").unwrap_err(),
            ParseError::InvalidSyntax(_)
        ));
    }
}
