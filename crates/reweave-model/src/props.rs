//! Observed prop values
//!
//! Prop values are an arbitrary nested structure whose leaves may be plain
//! data, function references, or embedded elements (an instance's type plus
//! props that may never have been rendered). The engine never inspects them
//! with ad hoc type checks; everything goes through the exhaustive
//! [`PropValue`] union and its walkers.

use crate::ids::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One step of a [`PropPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Map key or top-level prop name
    Key(String),
    /// List index
    Index(usize),
}

/// Address of a position inside a prop tree.
///
/// Rendered as `items[2].label`. Paths address through embedded elements
/// transparently: a segment that lands on an element continues into that
/// element's props.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropPath(Vec<PathSegment>);

impl PropPath {
    /// The empty path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A single-segment path addressing the top-level prop `name`.
    pub fn key(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(name.into())])
    }

    /// This path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// The segments, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` addresses this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &PropPath) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for PropPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{k}")?;
                }
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PropPath {
    type Err = PropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for part in s.split('.').filter(|p| !p.is_empty()) {
            let mut rest = part;
            if let Some(bracket) = rest.find('[') {
                if bracket > 0 {
                    segments.push(PathSegment::Key(rest[..bracket].to_string()));
                }
                rest = &rest[bracket..];
                while let Some(stripped) = rest.strip_prefix('[') {
                    let close = stripped
                        .find(']')
                        .ok_or_else(|| PropError::InvalidPath(s.to_string()))?;
                    let idx = stripped[..close]
                        .parse::<usize>()
                        .map_err(|_| PropError::InvalidPath(s.to_string()))?;
                    segments.push(PathSegment::Index(idx));
                    rest = &stripped[close + 1..];
                }
                if !rest.is_empty() {
                    return Err(PropError::InvalidPath(s.to_string()));
                }
            } else {
                segments.push(PathSegment::Key(rest.to_string()));
            }
        }
        Ok(Self(segments))
    }
}

impl Serialize for PropPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PropPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An element carried inside props rather than rendered by its carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedElement {
    /// Type of the carried element.
    pub type_id: TypeId,
    /// Props the element was captured with.
    pub props: Props,
}

/// Exhaustive union over every observable prop value shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropValue {
    /// Absent value
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(f64),
    /// Text scalar
    Text(String),
    /// Ordered list of values
    List(Vec<PropValue>),
    /// Keyed map; ordered so equal maps serialize identically
    Map(BTreeMap<String, PropValue>),
    /// Function reference; only the observed name survives the snapshot.
    Function {
        /// Name the function was observed under.
        name: String,
    },
    /// Embedded element, possibly never materialized as a tree node.
    Element(EmbeddedElement),
    /// Opaque stand-in for a caller-supplied region, tagged by prop path.
    /// Introduced by the extractor, never present in a raw snapshot.
    Placeholder {
        /// Prop path the region was supplied through.
        path: PropPath,
    },
}

impl PropValue {
    /// Shorthand for a text scalar.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Visit this value and every nested value, depth-first.
    ///
    /// Embedded elements are transparent containers: the walk descends into
    /// their props, extending the path with the element's prop keys.
    pub fn walk<F: FnMut(&PropPath, &PropValue)>(&self, f: &mut F) {
        self.walk_at(&PropPath::root(), f);
    }

    fn walk_at<F: FnMut(&PropPath, &PropValue)>(&self, path: &PropPath, f: &mut F) {
        f(path, self);
        match self {
            PropValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.walk_at(&path.child(PathSegment::Index(i)), f);
                }
            }
            PropValue::Map(entries) => {
                for (key, value) in entries {
                    value.walk_at(&path.child(PathSegment::Key(key.clone())), f);
                }
            }
            PropValue::Element(element) => {
                for (key, value) in &element.props.0 {
                    value.walk_at(&path.child(PathSegment::Key(key.clone())), f);
                }
            }
            _ => {}
        }
    }
}

/// Top-level props of one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props(
    /// Prop name to value, ordered
    pub BTreeMap<String, PropValue>,
);

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: PropValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Whether no props were captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Visit every value reachable from these props, with its path.
    pub fn walk<F: FnMut(&PropPath, &PropValue)>(&self, f: &mut F) {
        for (key, value) in &self.0 {
            value.walk_at(&PropPath::key(key.clone()), f);
        }
    }

    /// Visit every embedded element reachable from these props.
    pub fn for_each_element<F: FnMut(&PropPath, &EmbeddedElement)>(&self, mut f: F) {
        self.walk(&mut |path, value| {
            if let PropValue::Element(element) = value {
                f(path, element);
            }
        });
    }

    /// Look up the value at `path`.
    pub fn get(&self, path: &PropPath) -> Option<&PropValue> {
        let mut segments = path.segments().iter();
        let first = match segments.next()? {
            PathSegment::Key(k) => k,
            PathSegment::Index(_) => return None,
        };
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match (current, segment) {
                (PropValue::List(items), PathSegment::Index(i)) => items.get(*i)?,
                (PropValue::Map(entries), PathSegment::Key(k)) => entries.get(k)?,
                (PropValue::Element(element), PathSegment::Key(k)) => element.props.0.get(k)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replace the value at `path`, returning the previous value.
    pub fn replace_at(&mut self, path: &PropPath, value: PropValue) -> Result<PropValue, PropError> {
        let slot = self
            .slot_mut(path)
            .ok_or_else(|| PropError::PathNotFound(path.clone()))?;
        Ok(std::mem::replace(slot, value))
    }

    fn slot_mut(&mut self, path: &PropPath) -> Option<&mut PropValue> {
        let mut segments = path.segments().iter();
        let first = match segments.next()? {
            PathSegment::Key(k) => k,
            PathSegment::Index(_) => return None,
        };
        let mut current = self.0.get_mut(first)?;
        for segment in segments {
            current = match (current, segment) {
                (PropValue::List(items), PathSegment::Index(i)) => items.get_mut(*i)?,
                (PropValue::Map(entries), PathSegment::Key(k)) => entries.get_mut(k)?,
                (PropValue::Element(element), PathSegment::Key(k)) => {
                    element.props.0.get_mut(k)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Errors raised by prop path handling.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropError {
    /// The textual path form could not be parsed.
    #[error("invalid prop path: {0}")]
    InvalidPath(String),

    /// The path addresses no position in the prop tree.
    #[error("prop path not found: {0}")]
    PathNotFound(PropPath),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_props() -> Props {
        Props::new()
            .with("label", PropValue::text("hello"))
            .with(
                "items",
                PropValue::List(vec![
                    PropValue::Number(1.0),
                    PropValue::Map(BTreeMap::from([(
                        "name".to_string(),
                        PropValue::text("two"),
                    )])),
                ]),
            )
    }

    #[test]
    fn path_display_and_parse() {
        let path: PropPath = "items[1].name".parse().unwrap();
        assert_eq!(path.to_string(), "items[1].name");
        assert_eq!(path.segments().len(), 3);
    }

    #[test]
    fn path_rejects_malformed_index() {
        assert!("items[x]".parse::<PropPath>().is_err());
        assert!("items[1".parse::<PropPath>().is_err());
    }

    #[test]
    fn get_follows_nested_path() {
        let props = sample_props();
        let path: PropPath = "items[1].name".parse().unwrap();
        assert_eq!(props.get(&path), Some(&PropValue::text("two")));
    }

    #[test]
    fn replace_at_returns_previous() {
        let mut props = sample_props();
        let path: PropPath = "label".parse().unwrap();
        let old = props
            .replace_at(&path, PropValue::Placeholder { path: path.clone() })
            .unwrap();
        assert_eq!(old, PropValue::text("hello"));
        assert!(matches!(
            props.get(&path),
            Some(PropValue::Placeholder { .. })
        ));
    }

    #[test]
    fn replace_at_missing_path_errors() {
        let mut props = sample_props();
        let path: PropPath = "nope.deep".parse().unwrap();
        assert!(matches!(
            props.replace_at(&path, PropValue::Null),
            Err(PropError::PathNotFound(_))
        ));
    }

    #[test]
    fn walk_descends_into_embedded_elements() {
        let inner = EmbeddedElement {
            type_id: TypeId::new(),
            props: Props::new().with("depth", PropValue::Number(2.0)),
        };
        let props = Props::new().with("content", PropValue::Element(inner));

        let mut seen = Vec::new();
        props.walk(&mut |path, _| seen.push(path.to_string()));

        assert!(seen.contains(&"content".to_string()));
        assert!(seen.contains(&"content.depth".to_string()));
    }

    #[test]
    fn for_each_element_finds_nested() {
        let leaf = EmbeddedElement {
            type_id: TypeId::new(),
            props: Props::new(),
        };
        let outer = EmbeddedElement {
            type_id: TypeId::new(),
            props: Props::new().with("slot", PropValue::Element(leaf)),
        };
        let props = Props::new().with("content", PropValue::Element(outer));

        let mut paths = Vec::new();
        props.for_each_element(|path, _| paths.push(path.to_string()));
        assert_eq!(paths, vec!["content".to_string(), "content.slot".to_string()]);
    }

    #[test]
    fn prop_path_serde_as_string() {
        let path: PropPath = "items[0]".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"items[0]\"");
        let back: PropPath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, back);
    }
}
