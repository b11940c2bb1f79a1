/// Traversal builder and terminal steps

use super::evaluator::{self, Context, Stream};
use super::step::{Direction, Ids, Keys, Labels, Step};
use super::{ExecutionError, ExecutionResult, Value};
use crate::storage::SharedStorage;
use crate::types::ID_KEY;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Entry point for traversals bound to a store, conventionally named `g`
#[derive(Clone)]
pub struct GraphTraversalSource {
    name: String,
    storage: SharedStorage,
    open: Arc<AtomicBool>,
}

impl GraphTraversalSource {
    /// Traversal source named `g` that is always open
    pub fn new(storage: SharedStorage) -> Self {
        Self::bound("g", storage, Arc::new(AtomicBool::new(true)))
    }

    /// Traversal source whose liveness follows `open`
    pub(crate) fn bound(name: impl Into<String>, storage: SharedStorage, open: Arc<AtomicBool>) -> Self {
        Self {
            name: name.into(),
            storage,
            open,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn spawn(&self, step: Step) -> Traversal {
        Traversal {
            source: Some(self.clone()),
            steps: vec![step],
            invalid: None,
        }
    }

    /// `g.V(ids...)`
    pub fn v(&self, ids: impl Into<Ids>) -> Traversal {
        self.spawn(Step::V(ids.into().into_inner()))
    }

    /// `g.E(ids...)`
    pub fn e(&self, ids: impl Into<Ids>) -> Traversal {
        self.spawn(Step::E(ids.into().into_inner()))
    }

    /// `g.addV(label)`
    pub fn add_v(&self, label: impl Into<String>) -> Traversal {
        self.spawn(Step::AddV {
            label: label.into(),
            id: None,
            properties: Vec::new(),
        })
    }

    /// `g.addE(label)`; both ends must be given with `from()` and `to()`
    pub fn add_e(&self, label: impl Into<String>) -> Traversal {
        self.spawn(Step::AddE {
            label: label.into(),
            id: None,
            from: None,
            to: None,
            properties: Vec::new(),
        })
    }
}

impl fmt::Debug for GraphTraversalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphTraversalSource")
            .field("name", &self.name)
            .field("graph", &self.storage.graph_name())
            .field("open", &self.is_open())
            .finish()
    }
}

/// An ordered list of steps, evaluated lazily by its terminal methods
///
/// Builder methods consume and return the traversal; terminals borrow it,
/// so one definition can be evaluated any number of times.
#[derive(Clone)]
pub struct Traversal {
    source: Option<GraphTraversalSource>,
    steps: Vec<Step>,
    /// First builder misuse, reported by the terminal
    invalid: Option<String>,
}

/// Spawns anonymous traversals (`__.V('2')`, `__.out('knows')`)
///
/// Anonymous traversals cannot run on their own; they are evaluated as
/// children of another traversal (for example as `addE().to()` targets).
#[allow(non_camel_case_types)]
pub struct __;

impl __ {
    fn start(step: Step) -> Traversal {
        Traversal::anonymous().push(step)
    }

    pub fn v(ids: impl Into<Ids>) -> Traversal {
        Self::start(Step::V(ids.into().into_inner()))
    }

    pub fn e(ids: impl Into<Ids>) -> Traversal {
        Self::start(Step::E(ids.into().into_inner()))
    }

    pub fn add_v(label: impl Into<String>) -> Traversal {
        Traversal::anonymous().add_v(label)
    }

    pub fn out(labels: impl Into<Labels>) -> Traversal {
        Traversal::anonymous().out(labels)
    }

    pub fn in_(labels: impl Into<Labels>) -> Traversal {
        Traversal::anonymous().in_(labels)
    }

    pub fn both(labels: impl Into<Labels>) -> Traversal {
        Traversal::anonymous().both(labels)
    }

    pub fn has_label(labels: impl Into<Labels>) -> Traversal {
        Traversal::anonymous().has_label(labels)
    }

    pub fn has_id(ids: impl Into<Ids>) -> Traversal {
        Traversal::anonymous().has_id(ids)
    }

    pub fn has(key: impl Into<String>, value: impl Into<JsonValue>) -> Traversal {
        Traversal::anonymous().has(key, value)
    }

    pub fn values(keys: impl Into<Keys>) -> Traversal {
        Traversal::anonymous().values(keys)
    }
}

fn id_from_json(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Traversal {
    /// Empty traversal with no source
    pub fn anonymous() -> Self {
        Self {
            source: None,
            steps: Vec::new(),
            invalid: None,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn source(&self) -> Option<&GraphTraversalSource> {
        self.source.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.source.is_none()
    }

    /// Bind the traversal to a source, e.g. one parsed from script text
    pub fn with_source(mut self, source: GraphTraversalSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Append a step as-is, without folding
    pub fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    fn reject(mut self, message: String) -> Self {
        if self.invalid.is_none() {
            self.invalid = Some(message);
        }
        self
    }

    /// Mid-traversal `V(ids...)`
    pub fn v(self, ids: impl Into<Ids>) -> Self {
        self.push(Step::V(ids.into().into_inner()))
    }

    /// Mid-traversal `E(ids...)`
    pub fn e(self, ids: impl Into<Ids>) -> Self {
        self.push(Step::E(ids.into().into_inner()))
    }

    /// `addV(label)`
    pub fn add_v(self, label: impl Into<String>) -> Self {
        self.push(Step::AddV {
            label: label.into(),
            id: None,
            properties: Vec::new(),
        })
    }

    /// `addE(label)`; ends default to the current vertex
    pub fn add_e(self, label: impl Into<String>) -> Self {
        self.push(Step::AddE {
            label: label.into(),
            id: None,
            from: None,
            to: None,
            properties: Vec::new(),
        })
    }

    /// `from(target)` modulating the preceding `addE()`
    pub fn from(self, target: Traversal) -> Self {
        self.set_edge_end(Direction::Out, target)
    }

    /// `to(target)` modulating the preceding `addE()`
    pub fn to(self, target: Traversal) -> Self {
        self.set_edge_end(Direction::In, target)
    }

    fn set_edge_end(mut self, end: Direction, target: Traversal) -> Self {
        let modulator = if end == Direction::Out { "from" } else { "to" };
        if let Some(Step::AddE { from, to, .. }) = self.steps.last_mut() {
            let slot = if end == Direction::Out { from } else { to };
            *slot = Some(Box::new(target));
            return self;
        }
        self.reject(format!("{}() must directly follow addE()", modulator))
    }

    /// `property(key, value)`
    ///
    /// Directly after `addV()`/`addE()` the property is applied as part of
    /// the creation, and the `id` key (`T::Id`) sets the new element's id.
    /// Anywhere else it sets the property on every incoming element.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let key = key.into();
        let value = value.into();

        if let Some(Step::AddV { id, properties, .. } | Step::AddE { id, properties, .. }) =
            self.steps.last_mut()
        {
            if key == ID_KEY {
                if id.is_some() {
                    return self.reject(format!("element id given twice, second value {}", value));
                }
                match id_from_json(&value) {
                    Some(new_id) => *id = Some(new_id),
                    None => return self.reject(format!("element id must be a string or number, got {}", value)),
                }
            } else {
                properties.push((key, value));
            }
            return self;
        }

        self.push(Step::Property { key, value })
    }

    pub fn has_label(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::HasLabel(labels.into().into_inner()))
    }

    pub fn has_id(self, ids: impl Into<Ids>) -> Self {
        self.push(Step::HasId(ids.into().into_inner()))
    }

    /// `has(key, value)`
    pub fn has(self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.push(Step::Has {
            key: key.into(),
            value: Some(value.into()),
        })
    }

    /// `has(key)`: the element carries the property at all
    pub fn has_key(self, key: impl Into<String>) -> Self {
        self.push(Step::Has {
            key: key.into(),
            value: None,
        })
    }

    pub fn out(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Vertices {
            direction: Direction::Out,
            labels: labels.into().into_inner(),
        })
    }

    pub fn in_(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Vertices {
            direction: Direction::In,
            labels: labels.into().into_inner(),
        })
    }

    pub fn both(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Vertices {
            direction: Direction::Both,
            labels: labels.into().into_inner(),
        })
    }

    pub fn out_e(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Edges {
            direction: Direction::Out,
            labels: labels.into().into_inner(),
        })
    }

    pub fn in_e(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Edges {
            direction: Direction::In,
            labels: labels.into().into_inner(),
        })
    }

    pub fn both_e(self, labels: impl Into<Labels>) -> Self {
        self.push(Step::Edges {
            direction: Direction::Both,
            labels: labels.into().into_inner(),
        })
    }

    pub fn out_v(self) -> Self {
        self.push(Step::EdgeVertex(Direction::Out))
    }

    pub fn in_v(self) -> Self {
        self.push(Step::EdgeVertex(Direction::In))
    }

    pub fn both_v(self) -> Self {
        self.push(Step::EdgeVertex(Direction::Both))
    }

    pub fn values(self, keys: impl Into<Keys>) -> Self {
        self.push(Step::Values(keys.into().into_inner()))
    }

    /// `valueMap(includeTokens)` over all property keys
    pub fn value_map(self, include_tokens: bool) -> Self {
        self.value_map_keys(include_tokens, ())
    }

    /// `valueMap(includeTokens, keys...)`
    pub fn value_map_keys(self, include_tokens: bool, keys: impl Into<Keys>) -> Self {
        self.push(Step::ValueMap {
            include_tokens,
            keys: keys.into().into_inner(),
        })
    }

    pub fn id(self) -> Self {
        self.push(Step::Id)
    }

    pub fn label(self) -> Self {
        self.push(Step::Label)
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Step::Limit(n))
    }

    pub fn dedup(self) -> Self {
        self.push(Step::Dedup)
    }

    pub fn count(self) -> Self {
        self.push(Step::Count)
    }

    /// Builder misuse anywhere in this traversal or its children
    pub(crate) fn check_valid(&self) -> ExecutionResult<()> {
        if let Some(message) = &self.invalid {
            return Err(ExecutionError::InvalidArgument(message.clone()));
        }
        for step in &self.steps {
            if let Step::AddE { from, to, .. } = step {
                for child in from.iter().chain(to.iter()) {
                    child.check_valid()?;
                }
            }
        }
        Ok(())
    }

    fn context(&self, deadline: Option<Instant>) -> ExecutionResult<Context> {
        self.check_valid()?;
        let source = self.source.as_ref().ok_or_else(|| {
            ExecutionError::InvalidArgument(
                "anonymous traversals run only as children of a bound traversal".into(),
            )
        })?;
        if !source.is_open() {
            return Err(ExecutionError::Connection(format!(
                "traversal source '{}' belongs to a closed session",
                source.name()
            )));
        }
        tracing::debug!(traversal = %self, "evaluating traversal");
        Ok(Context::new(source.storage().clone(), deadline))
    }

    fn stream(&self, deadline: Option<Instant>) -> ExecutionResult<Stream<'_>> {
        let ctx = self.context(deadline)?;
        Ok(evaluator::evaluate(&ctx, &self.steps, None))
    }

    /// Lazy result iterator; each pull drives the chain just far enough
    pub fn iter(&self) -> ExecutionResult<TraversalIter<'_>> {
        Ok(TraversalIter {
            inner: self.stream(None)?,
        })
    }

    /// Pull exactly one result
    ///
    /// # Returns
    /// * `Err(ExecutionError::NoSuchElement)` if the traversal is empty
    pub fn next(&self) -> ExecutionResult<Value> {
        self.try_next()?.ok_or(ExecutionError::NoSuchElement)
    }

    /// Pull at most one result
    pub fn try_next(&self) -> ExecutionResult<Option<Value>> {
        self.stream(None)?.next().transpose()
    }

    /// Drain every result
    pub fn to_list(&self) -> ExecutionResult<Vec<Value>> {
        self.stream(None)?.collect()
    }

    /// Drain the traversal for its side effects
    pub fn iterate(&self) -> ExecutionResult<()> {
        for item in self.stream(None)? {
            item?;
        }
        Ok(())
    }

    /// `next()` that gives up with `DeadlineExceeded` once `deadline` passes
    pub fn next_before(&self, deadline: Instant) -> ExecutionResult<Value> {
        self.stream(Some(deadline))?
            .next()
            .transpose()?
            .ok_or(ExecutionError::NoSuchElement)
    }

    /// `toList()` that gives up with `DeadlineExceeded` once `deadline` passes
    pub fn to_list_before(&self, deadline: Instant) -> ExecutionResult<Vec<Value>> {
        self.stream(Some(deadline))?.collect()
    }
}

impl PartialEq for Traversal {
    fn eq(&self, other: &Self) -> bool {
        self.steps == other.steps && self.invalid == other.invalid
    }
}

impl fmt::Debug for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("steps", &self.steps)
            .field("invalid", &self.invalid)
            .finish()
    }
}

fn write_strings(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", JsonValue::from(item.as_str()))?;
    }
    Ok(())
}

fn write_creation_properties(
    f: &mut fmt::Formatter<'_>,
    id: &Option<String>,
    properties: &[(String, JsonValue)],
) -> fmt::Result {
    if let Some(id) = id {
        write!(f, ".property(T.id,{})", JsonValue::from(id.as_str()))?;
    }
    for (key, value) in properties {
        write!(f, ".property({},{})", JsonValue::from(key.as_str()), value)?;
    }
    Ok(())
}

/// Renders the traversal as Gremlin script text
impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source.as_ref().map_or("__", |s| s.name()))?;
        for step in &self.steps {
            write!(f, ".{}(", step.name())?;
            match step {
                Step::V(ids) | Step::E(ids) | Step::HasId(ids) => write_strings(f, ids)?,
                Step::HasLabel(labels)
                | Step::Values(labels)
                | Step::Vertices { labels, .. }
                | Step::Edges { labels, .. } => write_strings(f, labels)?,
                Step::AddV {
                    label,
                    id,
                    properties,
                } => {
                    write!(f, "{})", JsonValue::from(label.as_str()))?;
                    write_creation_properties(f, id, properties)?;
                    continue;
                }
                Step::AddE {
                    label,
                    id,
                    from,
                    to,
                    properties,
                } => {
                    write!(f, "{})", JsonValue::from(label.as_str()))?;
                    if let Some(from) = from {
                        write!(f, ".from({})", from)?;
                    }
                    if let Some(to) = to {
                        write!(f, ".to({})", to)?;
                    }
                    write_creation_properties(f, id, properties)?;
                    continue;
                }
                Step::Property { key, value } => {
                    write!(f, "{},{}", JsonValue::from(key.as_str()), value)?
                }
                Step::Has { key, value } => {
                    write!(f, "{}", JsonValue::from(key.as_str()))?;
                    if let Some(value) = value {
                        write!(f, ",{}", value)?;
                    }
                }
                Step::ValueMap {
                    include_tokens,
                    keys,
                } => {
                    write!(f, "{}", include_tokens)?;
                    if !keys.is_empty() {
                        f.write_str(",")?;
                        write_strings(f, keys)?;
                    }
                }
                Step::Limit(n) => write!(f, "{}", n)?,
                Step::EdgeVertex(_) | Step::Id | Step::Label | Step::Dedup | Step::Count => {}
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Lazy iterator over traversal results
pub struct TraversalIter<'a> {
    inner: Stream<'a>,
}

impl Iterator for TraversalIter<'_> {
    type Item = ExecutionResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn source() -> GraphTraversalSource {
        GraphTraversalSource::new(Arc::new(MemoryStorage::new("builder")))
    }

    #[test]
    fn test_property_folds_into_add_v() {
        let t = source()
            .add_v("person")
            .property("id", "1")
            .property("name", "Alice");

        assert_eq!(
            t.steps(),
            &[Step::AddV {
                label: "person".into(),
                id: Some("1".into()),
                properties: vec![("name".into(), json!("Alice"))],
            }]
        );
    }

    #[test]
    fn test_property_after_other_step_is_separate() {
        let t = source().v("1").property("name", "Alice");

        assert_eq!(t.steps().len(), 2);
        assert_eq!(
            t.steps()[1],
            Step::Property {
                key: "name".into(),
                value: json!("Alice")
            }
        );
    }

    #[test]
    fn test_to_without_add_e_is_rejected_at_terminal() {
        let t = source().v("1").to(__::v("2"));

        assert!(matches!(t.to_list(), Err(ExecutionError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_id_value_is_rejected() {
        let t = source().add_v("person").property(crate::traversal::T::Id, true);

        assert!(matches!(t.next(), Err(ExecutionError::InvalidArgument(_))));
    }

    #[test]
    fn test_second_id_is_rejected() {
        let g = source();

        let t = g.add_v("person").property("id", "1").property(crate::traversal::T::Id, "2");
        assert!(matches!(t.next(), Err(ExecutionError::InvalidArgument(_))));
        assert_eq!(g.storage().vertex_count(), 0);

        g.add_v("person").property("id", "1").iterate().unwrap();
        let t = g
            .v("1")
            .add_e("self")
            .property("id", "e1")
            .property("id", "e2");
        assert!(matches!(t.next(), Err(ExecutionError::InvalidArgument(_))));
        assert_eq!(g.storage().edge_count(), 0);
    }

    #[test]
    fn test_mid_traversal_e_matches_start_e() {
        let t = __::v("1").e("7");
        assert_eq!(t.steps()[1], Step::E(vec!["7".to_string()]));
        assert_eq!(source().e("7").steps()[0], t.steps()[1]);
    }

    #[test]
    fn test_anonymous_traversal_cannot_run_alone() {
        assert!(matches!(
            __::v("1").to_list(),
            Err(ExecutionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_display_renders_gremlin() {
        let g = source();
        let t = g
            .v("1")
            .add_e("knows")
            .to(__::v("2"))
            .property("id", "e1")
            .property("since", 2023);

        assert_eq!(
            t.to_string(),
            r#"g.V("1").addE("knows").to(__.V("2")).property(T.id,"e1").property("since",2023)"#
        );

        let t = g.v(()).has_label("person").value_map(true);
        assert_eq!(t.to_string(), r#"g.V().hasLabel("person").valueMap(true)"#);
    }
}
