/// Lazy step evaluation
///
/// Every step wraps the stream of the step before it. Pulling from the last
/// stream pulls, one traverser at a time, through the whole chain down to the
/// start step. Mutating steps run only when a traverser reaches them.

use super::builder::Traversal;
use super::step::{Direction, Step};
use super::{ExecutionError, ExecutionResult, Value};
use crate::storage::{EdgeScan, SharedStorage, VertexScan};
use crate::types::{Edge, ID_KEY, LABEL_KEY};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::iter;
use std::time::Instant;

pub(crate) type Stream<'a> = Box<dyn Iterator<Item = ExecutionResult<Value>> + 'a>;

/// Per-evaluation state shared by every step
#[derive(Clone)]
pub(crate) struct Context {
    pub storage: SharedStorage,
    pub deadline: Option<Instant>,
    /// Arena lengths when the terminal began; `V()`/`E()` scans stop there
    pub vertex_bound: usize,
    pub edge_bound: usize,
}

impl Context {
    pub fn new(storage: SharedStorage, deadline: Option<Instant>) -> Self {
        let vertex_bound = storage.vertex_count();
        let edge_bound = storage.edge_count();
        Self {
            storage,
            deadline,
            vertex_bound,
            edge_bound,
        }
    }
}

/// Compile `steps` into a lazy stream
///
/// `input` seeds child traversals with the parent's current traverser; a
/// leading start step ignores it. With a deadline, every stage checks it
/// before pulling from the stage below.
pub(crate) fn evaluate<'a>(ctx: &Context, steps: &'a [Step], input: Option<Value>) -> Stream<'a> {
    let mut stream: Stream<'a> = match input {
        Some(value) => Box::new(iter::once(Ok(value))),
        None => Box::new(iter::empty()),
    };

    for (index, step) in steps.iter().enumerate() {
        tracing::trace!(step = step.name(), index, "compiling step");
        stream = if index == 0 && step.is_start() {
            start(ctx, step)
        } else {
            apply(ctx, stream, step)
        };
        if let Some(deadline) = ctx.deadline {
            stream = with_deadline(stream, deadline);
        }
    }

    stream
}

fn with_deadline<'a>(mut upstream: Stream<'a>, deadline: Instant) -> Stream<'a> {
    let mut expired = false;
    Box::new(iter::from_fn(move || {
        if expired {
            return None;
        }
        if Instant::now() >= deadline {
            expired = true;
            return Some(Err(ExecutionError::DeadlineExceeded));
        }
        upstream.next()
    }))
}

fn map_ok<'a, F>(upstream: Stream<'a>, mut f: F) -> Stream<'a>
where
    F: FnMut(Value) -> ExecutionResult<Value> + 'a,
{
    Box::new(upstream.map(move |item| item.and_then(|value| f(value))))
}

fn filter_ok<'a, F>(upstream: Stream<'a>, mut predicate: F) -> Stream<'a>
where
    F: FnMut(&Value) -> bool + 'a,
{
    Box::new(upstream.filter(move |item| match item {
        Ok(value) => predicate(value),
        Err(_) => true,
    }))
}

fn flat_map_ok<'a, F>(upstream: Stream<'a>, mut f: F) -> Stream<'a>
where
    F: FnMut(Value) -> Stream<'a> + 'a,
{
    Box::new(upstream.flat_map(move |item| -> Stream<'a> {
        match item {
            Ok(value) => f(value),
            Err(e) => Box::new(iter::once(Err(e))),
        }
    }))
}

fn from_values<'a>(values: Vec<Value>) -> Stream<'a> {
    Box::new(values.into_iter().map(Ok))
}

/// Source stream of a start step
fn start<'a>(ctx: &Context, step: &'a Step) -> Stream<'a> {
    let storage = ctx.storage.clone();
    match step {
        Step::V(ids) if ids.is_empty() => Box::new(
            VertexScan::new(storage, None)
                .until(ctx.vertex_bound)
                .map(|r| r.map(Value::Vertex).map_err(ExecutionError::from)),
        ),
        Step::V(ids) => Box::new(ids.iter().filter_map(move |id| -> Option<ExecutionResult<Value>> {
            match storage.get_vertex(id) {
                Ok(vertex) => vertex.map(|v| Ok(Value::Vertex(v))),
                Err(e) => Some(Err(e.into())),
            }
        })),
        Step::E(ids) if ids.is_empty() => Box::new(
            EdgeScan::new(storage, None)
                .until(ctx.edge_bound)
                .map(|r| r.map(Value::Edge).map_err(ExecutionError::from)),
        ),
        Step::E(ids) => Box::new(ids.iter().filter_map(move |id| -> Option<ExecutionResult<Value>> {
            match storage.get_edge(id) {
                Ok(edge) => edge.map(|e| Ok(Value::Edge(e))),
                Err(e) => Some(Err(e.into())),
            }
        })),
        Step::AddV { .. } | Step::AddE { .. } => {
            let ctx = ctx.clone();
            Box::new(iter::once_with(move || create_element(&ctx, step, None)))
        }
        other => Box::new(iter::once(Err(ExecutionError::InvalidArgument(format!(
            "{}() cannot start a traversal",
            other.name()
        ))))),
    }
}

/// Wrap `upstream` with a mid-traversal step
fn apply<'a>(ctx: &Context, upstream: Stream<'a>, step: &'a Step) -> Stream<'a> {
    let ctx = ctx.clone();
    match step {
        Step::V(_) | Step::E(_) => flat_map_ok(upstream, move |_| start(&ctx, step)),

        Step::AddV { .. } | Step::AddE { .. } => {
            map_ok(upstream, move |current| create_element(&ctx, step, Some(current)))
        }

        Step::Property { key, value } => map_ok(upstream, move |current| match current {
            Value::Vertex(v) => Ok(Value::Vertex(ctx.storage.set_vertex_property(
                &v.id,
                key,
                value.clone(),
            )?)),
            Value::Edge(e) => Ok(Value::Edge(ctx.storage.set_edge_property(
                &e.id,
                key,
                value.clone(),
            )?)),
            other => Err(type_mismatch("Vertex or Edge", &other)),
        }),

        Step::HasLabel(labels) => filter_ok(upstream, move |current| {
            current
                .element_label()
                .map_or(false, |label| labels.iter().any(|l| l == label))
        }),

        Step::HasId(ids) => filter_ok(upstream, move |current| {
            current
                .element_id()
                .map_or(false, |id| ids.iter().any(|i| i == id))
        }),

        Step::Has { key, value } => {
            filter_ok(upstream, move |current| has_property(current, key, value.as_ref()))
        }

        Step::Vertices { direction, labels } => flat_map_ok(upstream, move |current| {
            adjacent(&ctx, &current, *direction, labels, move |ctx, vertex_id, edge| {
                let other = other_end(vertex_id, edge, *direction);
                ctx.storage
                    .get_vertex(other)
                    .map_err(ExecutionError::from)?
                    .map(Value::Vertex)
                    .ok_or_else(|| ExecutionError::NotFound(format!("vertex {}", other)))
            })
        }),

        Step::Edges { direction, labels } => flat_map_ok(upstream, move |current| {
            adjacent(&ctx, &current, *direction, labels, |_, _, edge| {
                Ok(Value::Edge(edge.clone()))
            })
        }),

        Step::EdgeVertex(direction) => flat_map_ok(upstream, move |current| -> Stream<'a> {
            let edge = match current.as_edge() {
                Ok(edge) => edge,
                Err(e) => return Box::new(iter::once(Err(e))),
            };
            let ends: Vec<String> = match direction {
                Direction::Out => vec![edge.out_v.clone()],
                Direction::In => vec![edge.in_v.clone()],
                Direction::Both => vec![edge.out_v.clone(), edge.in_v.clone()],
            };
            let storage = ctx.storage.clone();
            Box::new(ends.into_iter().map(move |id| -> ExecutionResult<Value> {
                storage
                    .get_vertex(&id)?
                    .map(Value::Vertex)
                    .ok_or_else(|| ExecutionError::NotFound(format!("vertex {}", id)))
            }))
        }),

        Step::Values(keys) => flat_map_ok(upstream, move |current| -> Stream<'a> {
            match property_values(&current, keys) {
                Ok(values) => from_values(values),
                Err(e) => Box::new(iter::once(Err(e))),
            }
        }),

        Step::ValueMap {
            include_tokens,
            keys,
        } => map_ok(upstream, move |current| value_map(&current, *include_tokens, keys)),

        Step::Id => map_ok(upstream, |current| {
            current.element_id().map(|id| Value::String(id.to_string()))
        }),

        Step::Label => map_ok(upstream, |current| {
            current
                .element_label()
                .map(|label| Value::String(label.to_string()))
                .ok_or_else(|| type_mismatch("Vertex or Edge", &current))
        }),

        Step::Limit(n) => Box::new(upstream.take(*n)),

        Step::Dedup => {
            let mut seen = HashSet::new();
            filter_ok(upstream, move |current| seen.insert(dedup_key(current)))
        }

        Step::Count => Box::new(iter::once_with(move || -> ExecutionResult<Value> {
            let mut count = 0i64;
            for item in upstream {
                item?;
                count += 1;
            }
            Ok(Value::Integer(count))
        })),
    }
}

fn type_mismatch(expected: &str, actual: &Value) -> ExecutionError {
    ExecutionError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

fn other_end<'e>(vertex_id: &str, edge: &'e Edge, direction: Direction) -> &'e str {
    match direction {
        Direction::Out => &edge.in_v,
        Direction::In => &edge.out_v,
        Direction::Both => edge.other_end(vertex_id).unwrap_or(&edge.in_v),
    }
}

/// Edges incident to the current vertex, mapped through `project`
fn adjacent<'a, F>(
    ctx: &Context,
    current: &Value,
    direction: Direction,
    labels: &'a [String],
    project: F,
) -> Stream<'a>
where
    F: Fn(&Context, &str, &Edge) -> ExecutionResult<Value> + 'a,
{
    let vertex = match current.as_vertex() {
        Ok(vertex) => vertex,
        Err(e) => return Box::new(iter::once(Err(e))),
    };

    let mut edges: Vec<Edge> = Vec::new();
    if direction != Direction::In {
        match ctx.storage.get_outgoing_edges(&vertex.id) {
            Ok(out) => edges.extend(out),
            Err(e) => return Box::new(iter::once(Err(e.into()))),
        }
    }
    if direction != Direction::Out {
        match ctx.storage.get_incoming_edges(&vertex.id) {
            Ok(incoming) => edges.extend(incoming),
            Err(e) => return Box::new(iter::once(Err(e.into()))),
        }
    }

    let ctx = ctx.clone();
    let vertex_id = vertex.id.clone();
    Box::new(
        edges
            .into_iter()
            .filter(move |edge| labels.is_empty() || labels.iter().any(|l| *l == edge.label))
            .map(move |edge| project(&ctx, &vertex_id, &edge)),
    )
}

fn has_property(current: &Value, key: &str, expected: Option<&JsonValue>) -> bool {
    if key == ID_KEY || key == LABEL_KEY {
        let actual = if key == ID_KEY {
            current.element_id().ok()
        } else {
            current.element_label()
        };
        return match (actual, expected) {
            (Some(_), None) => true,
            (Some(actual), Some(JsonValue::String(s))) => actual == s.as_str(),
            (Some(actual), Some(JsonValue::Number(n))) => actual == n.to_string(),
            _ => false,
        };
    }

    match current {
        Value::Vertex(v) => match expected {
            None => v.has_property(key),
            Some(expected) => v.property_values(key).contains(expected),
        },
        Value::Edge(e) => match expected {
            None => e.has_property(key),
            Some(expected) => e.get_property(key) == Some(expected),
        },
        _ => false,
    }
}

fn property_values(current: &Value, keys: &[String]) -> ExecutionResult<Vec<Value>> {
    match current {
        Value::Vertex(v) => {
            let selected: Vec<&String> = if keys.is_empty() {
                v.properties.keys().collect()
            } else {
                keys.iter().collect()
            };
            Ok(selected
                .into_iter()
                .flat_map(|key| v.property_values(key).iter().map(Value::from))
                .collect())
        }
        Value::Edge(e) => {
            let selected: Vec<&String> = if keys.is_empty() {
                e.properties.keys().collect()
            } else {
                keys.iter().collect()
            };
            Ok(selected
                .into_iter()
                .filter_map(|key| e.get_property(key).map(Value::from))
                .collect())
        }
        other => Err(type_mismatch("Vertex or Edge", other)),
    }
}

fn value_map(current: &Value, include_tokens: bool, keys: &[String]) -> ExecutionResult<Value> {
    let selected = |key: &String| keys.is_empty() || keys.contains(key);
    let mut map = BTreeMap::new();

    match current {
        Value::Vertex(v) => {
            if include_tokens {
                map.insert(ID_KEY.to_string(), Value::String(v.id.clone()));
                map.insert(LABEL_KEY.to_string(), Value::String(v.label.clone()));
            }
            for (key, values) in v.properties.iter().filter(|(k, _)| selected(*k)) {
                map.insert(key.clone(), Value::List(values.iter().map(Value::from).collect()));
            }
        }
        Value::Edge(e) => {
            if include_tokens {
                map.insert(ID_KEY.to_string(), Value::String(e.id.clone()));
                map.insert(LABEL_KEY.to_string(), Value::String(e.label.clone()));
            }
            for (key, value) in e.properties.iter().filter(|(k, _)| selected(*k)) {
                map.insert(key.clone(), Value::from(value));
            }
        }
        other => return Err(type_mismatch("Vertex or Edge", other)),
    }

    Ok(Value::Map(map))
}

fn dedup_key(value: &Value) -> String {
    match value {
        Value::Vertex(v) => format!("v:{}", v.id),
        Value::Edge(e) => format!("e:{}", e.id),
        other => format!("x:{}", other.to_json()),
    }
}

/// Run an `addV`/`addE` step for one traverser (`None` when it starts the
/// traversal)
fn create_element(ctx: &Context, step: &Step, current: Option<Value>) -> ExecutionResult<Value> {
    match step {
        Step::AddV {
            label,
            id,
            properties,
        } => {
            let vertex = ctx
                .storage
                .create_vertex(id.as_deref(), label, properties)?;
            Ok(Value::Vertex(vertex))
        }
        Step::AddE {
            label,
            id,
            from,
            to,
            properties,
        } => {
            let out_v = resolve_end(ctx, from.as_deref(), current.as_ref(), "from")?;
            let in_v = resolve_end(ctx, to.as_deref(), current.as_ref(), "to")?;
            let edge = ctx
                .storage
                .create_edge(id.as_deref(), label, &out_v, &in_v, properties)?;
            Ok(Value::Edge(edge))
        }
        other => Err(ExecutionError::InvalidArgument(format!(
            "{}() does not create elements",
            other.name()
        ))),
    }
}

/// Vertex id an `addE()` end points at
fn resolve_end(
    ctx: &Context,
    target: Option<&Traversal>,
    current: Option<&Value>,
    modulator: &str,
) -> ExecutionResult<String> {
    match target {
        Some(target) => {
            target.check_valid()?;
            let mut results = evaluate(ctx, target.steps(), current.cloned());
            match results.next() {
                Some(Ok(value)) => Ok(value.as_vertex()?.id.clone()),
                Some(Err(e)) => Err(e),
                None => Err(ExecutionError::NotFound(format!(
                    "{}() target {} produced no vertex",
                    modulator, target
                ))),
            }
        }
        None => match current {
            Some(value) => Ok(value.as_vertex()?.id.clone()),
            None => Err(ExecutionError::InvalidArgument(format!(
                "addE() starting a traversal needs {}()",
                modulator
            ))),
        },
    }
}
