//! Lookup paths into a [`Value`](super::Value).

use crate::error::{Error, Result};
use std::fmt;

/// A segment in a lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Map key (e.g., "actions", "memo").
    Key(String),
    /// List index (e.g., "0", "1").
    Index(usize),
    /// Every element of a list (e.g., "*").
    Wildcard,
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::Wildcard => write!(f, "*"),
        }
    }
}

/// A parsed dotted path.
#[derive(Debug, Clone, Default)]
pub struct ValuePath {
    /// The segments that make up this path.
    pub segments: Vec<PathSegment>,
}

impl ValuePath {
    /// Parse a dot-notation path.
    ///
    /// # Examples
    ///
    /// - `"actions.0.account"` → `[Key("actions"), Index(0), Key("account")]`
    /// - `"actions.*.name"` → `[Key("actions"), Wildcard, Key("name")]`
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(ValuePath { segments: vec![] });
        }

        let segments = input
            .split('.')
            .map(Self::parse_segment)
            .collect::<Result<Vec<_>>>()?;

        Ok(ValuePath { segments })
    }

    fn parse_segment(s: &str) -> Result<PathSegment> {
        if s.is_empty() {
            return Err(Error::InvalidQuery(
                "Empty path segment (consecutive dots?)".to_string(),
            ));
        }

        if s == "*" {
            return Ok(PathSegment::Wildcard);
        }

        if let Ok(idx) = s.parse::<usize>() {
            return Ok(PathSegment::Index(idx));
        }

        Ok(PathSegment::Key(s.to_string()))
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, PathSegment::Wildcard))
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Render a path prefix for error messages.
pub(crate) fn render(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
