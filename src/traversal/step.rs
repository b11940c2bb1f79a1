/// Traversal steps
///
/// Steps are plain data; evaluation lives in the evaluator.

use super::builder::Traversal;
use crate::storage::PropertyList;
use crate::types::{ElementId, ID_KEY, LABEL_KEY};
use serde_json::Value as JsonValue;

/// Edge direction relative to the current vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Element tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum T {
    Id,
    Label,
}

impl T {
    pub fn as_str(&self) -> &'static str {
        match self {
            T::Id => ID_KEY,
            T::Label => LABEL_KEY,
        }
    }
}

impl From<T> for String {
    fn from(token: T) -> Self {
        token.as_str().to_string()
    }
}

/// A possibly empty list of strings passed to a step
///
/// `()` means "no filter", a single `&str` or `String` means one entry, and
/// arrays or vectors list several.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrList(pub Vec<String>);

/// Element ids passed to `V()`, `E()` and `hasId()`
pub type Ids = StrList;

/// Labels passed to `hasLabel()`, `out()`, ...
pub type Labels = StrList;

/// Property keys passed to `values()` and `valueMap()`
pub type Keys = StrList;

impl StrList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.iter().any(|s| s == item)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<()> for StrList {
    fn from(_: ()) -> Self {
        StrList(Vec::new())
    }
}

impl From<&str> for StrList {
    fn from(s: &str) -> Self {
        StrList(vec![s.to_string()])
    }
}

impl From<String> for StrList {
    fn from(s: String) -> Self {
        StrList(vec![s])
    }
}

impl From<&String> for StrList {
    fn from(s: &String) -> Self {
        StrList(vec![s.clone()])
    }
}

impl From<Vec<String>> for StrList {
    fn from(v: Vec<String>) -> Self {
        StrList(v)
    }
}

impl From<Vec<&str>> for StrList {
    fn from(v: Vec<&str>) -> Self {
        StrList(v.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for StrList {
    fn from(v: [&str; N]) -> Self {
        StrList(v.iter().map(|s| s.to_string()).collect())
    }
}

/// A single traversal step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `V(ids...)`: all vertices, or the listed ones
    V(Vec<ElementId>),

    /// `E(ids...)`: all edges, or the listed ones
    E(Vec<ElementId>),

    /// `addV(label)` with any directly following `property()` steps folded in
    AddV {
        label: String,
        id: Option<ElementId>,
        properties: PropertyList,
    },

    /// `addE(label).from(..).to(..)`; a missing end is the current vertex
    AddE {
        label: String,
        id: Option<ElementId>,
        from: Option<Box<Traversal>>,
        to: Option<Box<Traversal>>,
        properties: PropertyList,
    },

    /// `property(key, value)` on every incoming element
    Property { key: String, value: JsonValue },

    HasLabel(Vec<String>),

    HasId(Vec<ElementId>),

    /// `has(key)` when `value` is `None`, `has(key, value)` otherwise
    Has {
        key: String,
        value: Option<JsonValue>,
    },

    /// `out()`, `in()`, `both()`
    Vertices {
        direction: Direction,
        labels: Vec<String>,
    },

    /// `outE()`, `inE()`, `bothE()`
    Edges {
        direction: Direction,
        labels: Vec<String>,
    },

    /// `outV()`, `inV()`, `bothV()`
    EdgeVertex(Direction),

    Values(Vec<String>),

    ValueMap {
        include_tokens: bool,
        keys: Vec<String>,
    },

    Id,

    Label,

    Limit(usize),

    Dedup,

    Count,
}

impl Step {
    /// Gremlin name of the step, used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Step::V(_) => "V",
            Step::E(_) => "E",
            Step::AddV { .. } => "addV",
            Step::AddE { .. } => "addE",
            Step::Property { .. } => "property",
            Step::HasLabel(_) => "hasLabel",
            Step::HasId(_) => "hasId",
            Step::Has { .. } => "has",
            Step::Vertices { direction, .. } => match direction {
                Direction::Out => "out",
                Direction::In => "in",
                Direction::Both => "both",
            },
            Step::Edges { direction, .. } => match direction {
                Direction::Out => "outE",
                Direction::In => "inE",
                Direction::Both => "bothE",
            },
            Step::EdgeVertex(direction) => match direction {
                Direction::Out => "outV",
                Direction::In => "inV",
                Direction::Both => "bothV",
            },
            Step::Values(_) => "values",
            Step::ValueMap { .. } => "valueMap",
            Step::Id => "id",
            Step::Label => "label",
            Step::Limit(_) => "limit",
            Step::Dedup => "dedup",
            Step::Count => "count",
        }
    }

    /// Start steps produce traversers without needing an incoming one
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            Step::V(_) | Step::E(_) | Step::AddV { .. } | Step::AddE { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_list_conversions() {
        assert!(StrList::from(()).is_empty());
        assert_eq!(StrList::from("1").into_inner(), vec!["1"]);
        assert_eq!(StrList::from(["1", "2"]).into_inner(), vec!["1", "2"]);
        assert!(StrList::from(vec!["a".to_string()]).contains("a"));
    }

    #[test]
    fn test_step_names() {
        let out = Step::Vertices {
            direction: Direction::Out,
            labels: vec![],
        };
        assert_eq!(out.name(), "out");
        assert_eq!(Step::EdgeVertex(Direction::In).name(), "inV");
        assert!(Step::V(vec![]).is_start());
        assert!(!Step::Count.is_start());
        assert_eq!(String::from(T::Id), "id");
    }
}
