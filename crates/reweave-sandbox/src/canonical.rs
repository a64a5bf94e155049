//! Markup canonicalization
//!
//! Two serializations of the same UI state differ in attribute order, class
//! token order, style declaration spelling, and insignificant whitespace.
//! Canonicalization folds those differences away so the diff only sees
//! semantic structure.

use crate::render::format_number;
use once_cell::sync::Lazy;
use regex::Regex;
use reweave_model::{MarkupNode, PropValue, Props};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Property aliases folded to one canonical name.
static STYLE_ALIASES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("word-wrap", "overflow-wrap"),
        ("grid-gap", "gap"),
        ("grid-row-gap", "row-gap"),
        ("grid-column-gap", "column-gap"),
        ("-webkit-border-radius", "border-radius"),
        ("-webkit-box-shadow", "box-shadow"),
    ])
});

static ZERO_DIMENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?0(?:\.0+)?(?:px|em|rem|ex|ch|vw|vh|vmin|vmax|pt|pc|in|cm|mm|q|%)$").unwrap()
});
static COMMA_SPACING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A markup node after canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalNode {
    /// Element with sorted attributes and canonicalized values.
    Element {
        /// Lowercased tag name.
        tag: String,
        /// Attributes, sorted by name.
        attrs: BTreeMap<String, String>,
        /// Canonical children, whitespace-only text dropped.
        children: Vec<CanonicalNode>,
    },
    /// Whitespace-collapsed text.
    Text(String),
    /// Opaque component reference with canonicalized props.
    Reference {
        /// Referenced component name.
        name: String,
        /// Props folded to canonical JSON.
        props: Value,
    },
    /// Caller-supplied region marker.
    Placeholder {
        /// Textual prop path of the region.
        path: String,
    },
}

impl CanonicalNode {
    /// Short label for diff reports.
    pub fn label(&self) -> String {
        match self {
            CanonicalNode::Element { tag, .. } => format!("<{tag}>"),
            CanonicalNode::Text(text) => format!("\"{text}\""),
            CanonicalNode::Reference { name, .. } => format!("<{name}/>"),
            CanonicalNode::Placeholder { path } => format!("<slot {path}>"),
        }
    }
}

/// Canonicalize one node. Whitespace-only text disappears (`None`).
pub fn canonicalize(node: &MarkupNode) -> Option<CanonicalNode> {
    match node {
        MarkupNode::Text(text) => {
            let collapsed = WHITESPACE_RUN_RE.replace_all(text.trim(), " ").into_owned();
            if collapsed.is_empty() {
                None
            } else {
                Some(CanonicalNode::Text(collapsed))
            }
        }
        MarkupNode::Placeholder { path } => Some(CanonicalNode::Placeholder {
            path: path.to_string(),
        }),
        MarkupNode::Reference { name, props } => Some(CanonicalNode::Reference {
            name: name.clone(),
            props: canonical_props(props),
        }),
        MarkupNode::Element(element) => {
            let mut attrs = BTreeMap::new();
            for (name, value) in &element.attrs {
                let name = name.to_ascii_lowercase();
                let value = match name.as_str() {
                    "class" => canonical_class(value),
                    "style" => canonical_style(value),
                    _ => value.clone(),
                };
                attrs.insert(name, value);
            }
            let children = canonicalize_all(&element.children);
            Some(CanonicalNode::Element {
                tag: element.tag.to_ascii_lowercase(),
                attrs,
                children,
            })
        }
    }
}

/// Canonicalize a node list, dropping whitespace-only text.
pub fn canonicalize_all(nodes: &[MarkupNode]) -> Vec<CanonicalNode> {
    nodes.iter().filter_map(canonicalize).collect()
}

fn canonical_class(value: &str) -> String {
    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}

fn canonical_style(value: &str) -> String {
    let mut declarations = BTreeMap::new();
    for declaration in value.split(';') {
        let Some((property, raw)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        if property.is_empty() {
            continue;
        }
        let property = STYLE_ALIASES
            .get(property.as_str())
            .map_or(property.as_str(), |v| *v)
            .to_string();
        declarations.insert(property, canonical_style_value(raw.trim()));
    }
    declarations
        .into_iter()
        .map(|(property, value)| format!("{property}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn canonical_style_value(value: &str) -> String {
    let spaced = COMMA_SPACING_RE.replace_all(value, ",");
    spaced
        .split_whitespace()
        .map(canonical_style_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn canonical_style_token(token: &str) -> String {
    // Function arguments get the same zero-dimension folding as bare tokens.
    if let Some(open) = token.find('(') {
        if let Some(close) = token.rfind(')') {
            if close > open {
                let head = &token[..open];
                let args = token[open + 1..close]
                    .split(',')
                    .map(|arg| canonical_dimension(arg.trim()))
                    .collect::<Vec<_>>()
                    .join(",");
                let tail = &token[close + 1..];
                return format!("{head}({args}){tail}");
            }
        }
    }
    canonical_dimension(token)
}

fn canonical_dimension(token: &str) -> String {
    if ZERO_DIMENSION_RE.is_match(token) {
        "0".to_string()
    } else {
        token.to_string()
    }
}

fn canonical_props(props: &Props) -> Value {
    Value::Object(
        props
            .0
            .iter()
            .map(|(key, value)| (key.clone(), canonical_prop(value)))
            .collect(),
    )
}

/// Scalars fold to their text form so a literal invocation (`count="3"`)
/// and a recorded number (`3`) compare equal.
fn canonical_prop(value: &PropValue) -> Value {
    match value {
        PropValue::Null => Value::Null,
        PropValue::Bool(b) => Value::String(b.to_string()),
        PropValue::Number(n) => Value::String(format_number(*n)),
        PropValue::Text(s) => Value::String(s.clone()),
        PropValue::List(items) => Value::Array(items.iter().map(canonical_prop).collect()),
        PropValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), canonical_prop(value)))
                .collect(),
        ),
        PropValue::Function { name } => json!({ "$fn": name }),
        PropValue::Element(element) => json!({
            "$element": element.type_id.to_string(),
            "props": canonical_props(&element.props),
        }),
        PropValue::Placeholder { path } => json!({ "$slot": path.to_string() }),
    }
}
