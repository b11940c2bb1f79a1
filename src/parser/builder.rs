/// Script builder: converts pest parse pairs into traversal steps
///
/// Step calls are replayed through the `Traversal` builder methods, so a
/// parsed script and the equivalent builder chain record identical steps.

use super::{ParseError, ParseResult, Rule, Script, Terminal};
use crate::traversal::{StrList, Traversal, T};
use pest::iterators::{Pair, Pairs};
use serde_json::Value as JsonValue;

/// Name anonymous child traversals start from
const ANONYMOUS_SOURCE: &str = "__";

/// Label used by `addV()` without arguments
const DEFAULT_VERTEX_LABEL: &str = "vertex";

/// A step argument
#[derive(Debug)]
enum Arg {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Token(T),
    Traversal(Traversal),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Str(_) => "string",
            Arg::Int(_) => "integer",
            Arg::Float(_) => "float",
            Arg::Bool(_) => "boolean",
            Arg::Token(_) => "token",
            Arg::Traversal(_) => "traversal",
        }
    }
}

/// Build a script from the top-level pairs
pub fn build_script(pairs: Pairs<Rule>) -> ParseResult<Script> {
    for pair in pairs {
        if pair.as_rule() == Rule::script {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::traversal {
                    return build_top_level(inner);
                }
            }
        }
    }

    Err(ParseError::InvalidSyntax("empty script".to_string()))
}

fn build_top_level(pair: Pair<Rule>) -> ParseResult<Script> {
    let mut inner = pair.into_inner();
    let source = next_source(&mut inner)?;
    if source == ANONYMOUS_SOURCE {
        return Err(ParseError::InvalidSyntax(
            "a script must start from a traversal source, not __".to_string(),
        ));
    }

    let calls: Vec<Pair<Rule>> = inner.collect();
    let mut terminal = Terminal::ToList;
    let mut traversal = Traversal::anonymous();
    let count = calls.len();

    for (index, call) in calls.into_iter().enumerate() {
        let (name, args) = build_call(call, &source)?;

        if let Some(found) = terminal_for(&name) {
            if index + 1 != count {
                return Err(ParseError::InvalidSyntax(format!(
                    "{}() must be the last step of a script",
                    name
                )));
            }
            if !args.is_empty() {
                return Err(ParseError::InvalidSyntax(format!(
                    "{}() takes no arguments",
                    name
                )));
            }
            terminal = found;
            continue;
        }

        traversal = apply_step(traversal, &name, args)?;
    }

    if traversal.steps().is_empty() {
        return Err(ParseError::InvalidSyntax(format!(
            "script '{}' has no steps",
            source
        )));
    }

    Ok(Script {
        source,
        traversal,
        terminal,
    })
}

/// Build a traversal passed as an argument, e.g. `to(__.V('2'))`
fn build_nested(pair: Pair<Rule>, script_source: &str) -> ParseResult<Traversal> {
    let traversal_pair = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::InvalidSyntax("empty nested traversal".to_string()))?;
    let mut inner = traversal_pair.into_inner();
    let source = next_source(&mut inner)?;

    if source != ANONYMOUS_SOURCE && source != script_source {
        return Err(ParseError::InvalidSyntax(format!(
            "unknown traversal source '{}' in nested traversal",
            source
        )));
    }

    let mut traversal = Traversal::anonymous();
    for call in inner {
        let (name, args) = build_call(call, script_source)?;
        if terminal_for(&name).is_some() {
            return Err(ParseError::InvalidSyntax(format!(
                "{}() is not allowed inside a nested traversal",
                name
            )));
        }
        traversal = apply_step(traversal, &name, args)?;
    }

    if traversal.steps().is_empty() {
        return Err(ParseError::InvalidSyntax(
            "nested traversal has no steps".to_string(),
        ));
    }

    Ok(traversal)
}

fn next_source(inner: &mut Pairs<Rule>) -> ParseResult<String> {
    match inner.next() {
        Some(pair) if pair.as_rule() == Rule::source => Ok(pair.as_str().to_string()),
        _ => Err(ParseError::InvalidSyntax(
            "traversal is missing its source".to_string(),
        )),
    }
}

fn terminal_for(name: &str) -> Option<Terminal> {
    match name {
        "next" => Some(Terminal::Next),
        "toList" => Some(Terminal::ToList),
        "iterate" => Some(Terminal::Iterate),
        _ => None,
    }
}

fn build_call(pair: Pair<Rule>, script_source: &str) -> ParseResult<(String, Vec<Arg>)> {
    let mut name = String::new();
    let mut args = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => name = inner.as_str().to_string(),
            _ => args.push(build_arg(inner, script_source)?),
        }
    }

    Ok((name, args))
}

fn build_arg(pair: Pair<Rule>, script_source: &str) -> ParseResult<Arg> {
    match pair.as_rule() {
        Rule::token => match pair.as_str() {
            "T.id" => Ok(Arg::Token(T::Id)),
            _ => Ok(Arg::Token(T::Label)),
        },
        Rule::boolean => Ok(Arg::Bool(pair.as_str().eq_ignore_ascii_case("true"))),
        Rule::number => parse_number(pair.as_str()),
        Rule::string => {
            let raw = pair
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or_default();
            Ok(Arg::Str(unescape(raw)?))
        }
        Rule::nested => Ok(Arg::Traversal(build_nested(pair, script_source)?)),
        other => Err(ParseError::InvalidSyntax(format!(
            "unexpected argument {:?}",
            other
        ))),
    }
}

fn parse_number(text: &str) -> ParseResult<Arg> {
    let is_float = text.contains(['.', 'e', 'E']);
    if is_float {
        text.parse::<f64>()
            .map(Arg::Float)
            .map_err(|e| ParseError::InvalidSyntax(format!("invalid number '{}': {}", text, e)))
    } else {
        text.parse::<i64>()
            .map(Arg::Int)
            .map_err(|e| ParseError::InvalidSyntax(format!("invalid integer '{}': {}", text, e)))
    }
}

fn unescape(raw: &str) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        ParseError::InvalidSyntax(format!("invalid escape \\u{}", hex))
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {
                return Err(ParseError::InvalidSyntax(
                    "dangling escape at end of string".to_string(),
                ))
            }
        }
    }

    Ok(out)
}

fn invalid_arg(step: &str, expected: &str, arg: &Arg) -> ParseError {
    ParseError::InvalidSyntax(format!(
        "{}() expects {}, got {}",
        step,
        expected,
        arg.kind()
    ))
}

/// Labels and keys: strings only
fn strings(step: &str, args: Vec<Arg>) -> ParseResult<StrList> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Str(s) => Ok(s),
            other => Err(invalid_arg(step, "string arguments", &other)),
        })
        .collect::<ParseResult<Vec<_>>>()
        .map(StrList)
}

/// Element ids: strings or integers
fn ids(step: &str, args: Vec<Arg>) -> ParseResult<Vec<String>> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Str(s) => Ok(s),
            Arg::Int(i) => Ok(i.to_string()),
            other => Err(invalid_arg(step, "string or integer ids", &other)),
        })
        .collect()
}

fn key(step: &str, arg: Arg) -> ParseResult<String> {
    match arg {
        Arg::Str(s) => Ok(s),
        Arg::Token(token) => Ok(token.into()),
        other => Err(invalid_arg(step, "a property key", &other)),
    }
}

fn scalar(step: &str, arg: Arg) -> ParseResult<JsonValue> {
    match arg {
        Arg::Str(s) => Ok(JsonValue::String(s)),
        Arg::Int(i) => Ok(JsonValue::from(i)),
        Arg::Float(f) => Ok(JsonValue::from(f)),
        Arg::Bool(b) => Ok(JsonValue::Bool(b)),
        other => Err(invalid_arg(step, "a scalar value", &other)),
    }
}

fn arity(step: &str, args: &[Arg], allowed: &[usize]) -> ParseResult<()> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    Err(ParseError::InvalidSyntax(format!(
        "{}() does not take {} argument(s)",
        step,
        args.len()
    )))
}

/// Replay one step call onto the traversal
fn apply_step(traversal: Traversal, name: &str, args: Vec<Arg>) -> ParseResult<Traversal> {
    let traversal = match name {
        "V" => traversal.v(ids(name, args)?),
        "E" => traversal.e(ids(name, args)?),
        "addV" => {
            arity(name, &args, &[0, 1])?;
            let label = match args.into_iter().next() {
                Some(arg) => key(name, arg)?,
                None => DEFAULT_VERTEX_LABEL.to_string(),
            };
            traversal.add_v(label)
        }
        "addE" => {
            arity(name, &args, &[1])?;
            let mut args = args.into_iter();
            let label = match args.next() {
                Some(Arg::Str(label)) => label,
                Some(other) => return Err(invalid_arg(name, "an edge label", &other)),
                None => unreachable_arity(name)?,
            };
            traversal.add_e(label)
        }
        "from" | "from_" | "to" => {
            arity(name, &args, &[1])?;
            let target = match args.into_iter().next() {
                Some(Arg::Traversal(target)) => target,
                Some(other) => return Err(invalid_arg(name, "a traversal", &other)),
                None => unreachable_arity(name)?,
            };
            if name == "to" {
                traversal.to(target)
            } else {
                traversal.from(target)
            }
        }
        "property" => {
            arity(name, &args, &[2])?;
            let mut args = args.into_iter();
            let (k, v) = match (args.next(), args.next()) {
                (Some(k), Some(v)) => (key(name, k)?, scalar(name, v)?),
                _ => unreachable_arity(name)?,
            };
            traversal.property(k, v)
        }
        "hasLabel" => traversal.has_label(strings(name, args)?),
        "hasId" => traversal.has_id(ids(name, args)?),
        "has" => {
            arity(name, &args, &[1, 2, 3])?;
            let mut args: Vec<Arg> = args;
            match args.len() {
                1 => traversal.has_key(key(name, args.remove(0))?),
                2 => {
                    let value = scalar(name, args.remove(1))?;
                    traversal.has(key(name, args.remove(0))?, value)
                }
                _ => {
                    let value = scalar(name, args.remove(2))?;
                    let k = key(name, args.remove(1))?;
                    let label = match args.remove(0) {
                        Arg::Str(label) => label,
                        other => return Err(invalid_arg(name, "a vertex label", &other)),
                    };
                    traversal.has_label(label).has(k, value)
                }
            }
        }
        "out" => traversal.out(strings(name, args)?),
        "in" | "in_" => traversal.in_(strings(name, args)?),
        "both" => traversal.both(strings(name, args)?),
        "outE" => traversal.out_e(strings(name, args)?),
        "inE" => traversal.in_e(strings(name, args)?),
        "bothE" => traversal.both_e(strings(name, args)?),
        "outV" | "inV" | "bothV" | "id" | "label" | "dedup" | "count" => {
            arity(name, &args, &[0])?;
            match name {
                "outV" => traversal.out_v(),
                "inV" => traversal.in_v(),
                "bothV" => traversal.both_v(),
                "id" => traversal.id(),
                "label" => traversal.label(),
                "dedup" => traversal.dedup(),
                _ => traversal.count(),
            }
        }
        "values" => traversal.values(strings(name, args)?),
        "valueMap" => {
            let mut args = args;
            let include_tokens = match args.first() {
                Some(Arg::Bool(b)) => {
                    let b = *b;
                    args.remove(0);
                    b
                }
                _ => false,
            };
            traversal.value_map_keys(include_tokens, strings(name, args)?)
        }
        "limit" => {
            arity(name, &args, &[1])?;
            match args.into_iter().next() {
                Some(Arg::Int(n)) if n >= 0 => traversal.limit(n as usize),
                Some(other) => return Err(invalid_arg(name, "a non-negative integer", &other)),
                None => unreachable_arity(name)?,
            }
        }
        other => {
            return Err(ParseError::UnsupportedFeature(format!(
                "step {}() is not supported",
                other
            )))
        }
    };

    Ok(traversal)
}

/// Arity was already checked; kept as an error rather than a panic
fn unreachable_arity<R>(step: &str) -> ParseResult<R> {
    Err(ParseError::InvalidSyntax(format!(
        "{}() is missing an argument",
        step
    )))
}
