//! Dynamic JSON-like values.
//!
//! A [`Value`] is a string scalar, an ordered map, or an ordered list. It
//! carries both parsed ABI documents and decoded action arguments. Scalars
//! keep their text and are interpreted later by whoever knows the expected
//! type.

mod json;
mod path;

pub use path::{PathSegment, ValuePath};

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Ordered map of named values.
pub type ValueMap = IndexMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Scalar text. Numbers, booleans and `null` keep their literal spelling.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Ordered map of named values.
    Map(ValueMap),
}

impl Value {
    /// Literal text JSON `null` is captured as.
    pub const NULL: &'static str = "null";

    pub fn null() -> Self {
        Value::String(Self::NULL.to_string())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::String(s) if s == Self::NULL)
    }

    /// Follow a path of map keys and list indices.
    ///
    /// Each segment must match the kind of node it is applied to. A missing
    /// key, an out-of-range index, and a kind mismatch are distinct errors.
    pub fn get(&self, segments: &[PathSegment]) -> Result<&Value> {
        if segments.is_empty() {
            return Err(Error::InvalidQuery("no key specified".to_string()));
        }

        let mut current = self;
        for (depth, segment) in segments.iter().enumerate() {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Map(map)) => map
                    .get(key)
                    .ok_or_else(|| Error::FieldNotFound(key.clone()))?,
                (PathSegment::Index(idx), Value::List(items)) => {
                    items.get(*idx).ok_or(Error::IndexOutOfBounds(*idx))?
                }
                (PathSegment::Wildcard, _) => {
                    return Err(Error::InvalidQuery(
                        "Unexpected wildcard in non-wildcard path".to_string(),
                    ));
                }
                (segment, node) => {
                    return Err(Error::KindMismatch {
                        path: path::render(&segments[..=depth]),
                        expected: match segment {
                            PathSegment::Key(_) => "map",
                            _ => "list",
                        },
                        found: node.kind_name(),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Map lookup by key.
    pub fn get_key(&self, key: &str) -> Result<&Value> {
        self.get(&[PathSegment::Key(key.to_string())])
    }

    /// Evaluate a path that may contain wildcards, collecting every match.
    pub fn select(&self, segments: &[PathSegment]) -> Result<Vec<&Value>> {
        let Some((current, rest)) = segments.split_first() else {
            return Ok(vec![self]);
        };

        match current {
            PathSegment::Wildcard => {
                let items = self.as_list().ok_or_else(|| {
                    Error::InvalidQuery("Wildcard on non-list".to_string())
                })?;
                let mut results = Vec::new();
                for item in items {
                    results.extend(item.select(rest)?);
                }
                Ok(results)
            }
            segment => self
                .get(std::slice::from_ref(segment))?
                .select(rest),
        }
    }

    /// Parse JSON text.
    ///
    /// Objects become maps, arrays become lists, and every other token is
    /// captured as a scalar string.
    pub fn parse(text: &str) -> Result<Value> {
        Ok(serde_json::from_str(text)?)
    }

    /// Render as compact JSON.
    ///
    /// Scalars written in canonical base-10 integer form are emitted as
    /// JSON numbers; all other scalars are emitted as quoted strings.
    pub fn to_json(&self) -> String {
        // Serializing a Value into a String cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}
