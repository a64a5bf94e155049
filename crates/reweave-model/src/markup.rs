//! Rendered markup tree
//!
//! The snapshot carries the originally rendered markup with every element
//! tagged by the instance that produced it. The engine keeps a working copy
//! of this tree and collapses accepted regions into opaque references.

use crate::ids::InstanceId;
use crate::props::{PropPath, Props};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One element of rendered markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupElement {
    /// Element tag name.
    pub tag: String,
    /// Attributes, ordered by name.
    pub attrs: BTreeMap<String, String>,
    /// Child nodes in document order.
    pub children: Vec<MarkupNode>,
    /// Instance that produced this element, when known.
    pub instance: Option<InstanceId>,
}

impl MarkupElement {
    /// An empty element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            instance: None,
        }
    }

    /// Builder-style attribute insert.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder-style instance tag.
    #[must_use]
    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }
}

/// A node of the rendered markup tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupNode {
    /// An element and its subtree.
    Element(MarkupElement),
    /// A text node.
    Text(String),
    /// Opaque composition marker: an accepted component invoked with props.
    Reference {
        /// Accepted component name.
        name: String,
        /// Props the reference was invoked with.
        props: Props,
    },
    /// Opaque stand-in for a caller-supplied region, tagged by prop path.
    Placeholder {
        /// Prop path the region was supplied through.
        path: PropPath,
    },
}

impl MarkupNode {
    /// Start building an element node.
    pub fn element(tag: impl Into<String>) -> MarkupElement {
        MarkupElement::new(tag)
    }

    /// A text node.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Visit this node and all descendants, pre-order.
    pub fn walk<F: FnMut(&MarkupNode)>(&self, f: &mut F) {
        f(self);
        if let MarkupNode::Element(element) = self {
            for child in &element.children {
                child.walk(f);
            }
        }
    }

    /// Find the subtree produced by `instance`, if it is rendered here.
    pub fn find_instance(&self, instance: InstanceId) -> Option<&MarkupNode> {
        if let MarkupNode::Element(element) = self {
            if element.instance == Some(instance) {
                return Some(self);
            }
            for child in &element.children {
                if let Some(found) = child.find_instance(instance) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Drop instance tags from this subtree.
    ///
    /// Extraction copies lose their provenance once regions are resolved,
    /// so structurally equal copies compare and hash equal.
    pub fn strip_instances(&mut self) {
        if let MarkupNode::Element(element) = self {
            element.instance = None;
            for child in &mut element.children {
                child.strip_instances();
            }
        }
    }

    /// Replace every subtree produced by `instance` with `replacement`.
    ///
    /// Returns the number of regions replaced (0 when the instance never
    /// rendered, e.g. an embedded element that was never invoked).
    pub fn replace_instance(&mut self, instance: InstanceId, replacement: &MarkupNode) -> usize {
        let mut replaced = 0;
        if let MarkupNode::Element(element) = self {
            if element.instance == Some(instance) {
                *self = replacement.clone();
                return 1;
            }
            for child in &mut element.children {
                replaced += child.replace_instance(instance, replacement);
            }
        }
        replaced
    }
}

impl fmt::Display for MarkupNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupNode::Text(text) => write!(f, "{text}"),
            MarkupNode::Placeholder { path } => write!(f, "<slot path=\"{path}\"/>"),
            MarkupNode::Reference { name, props } => {
                if props.is_empty() {
                    write!(f, "<{name}/>")
                } else {
                    let json = serde_json::to_string(props).map_err(|_| fmt::Error)?;
                    write!(f, "<{name} props='{json}'/>")
                }
            }
            MarkupNode::Element(element) => {
                write!(f, "<{}", element.tag)?;
                for (name, value) in &element.attrs {
                    write!(f, " {name}=\"{value}\"")?;
                }
                if element.children.is_empty() {
                    return write!(f, "/>");
                }
                write!(f, ">")?;
                for child in &element.children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{}>", element.tag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree(badge: InstanceId, card: InstanceId) -> MarkupNode {
        MarkupNode::Element(
            MarkupElement::new("div")
                .with_instance(card)
                .with_attr("class", "card")
                .with_child(MarkupNode::Element(
                    MarkupElement::new("span")
                        .with_instance(badge)
                        .with_child(MarkupNode::text("New")),
                )),
        )
    }

    #[test]
    fn find_instance_locates_subtree() {
        let badge = InstanceId::new();
        let card = InstanceId::new();
        let root = tree(badge, card);

        let found = root.find_instance(badge).unwrap();
        match found {
            MarkupNode::Element(element) => assert_eq!(element.tag, "span"),
            other => panic!("unexpected node: {other:?}"),
        }
        assert!(root.find_instance(InstanceId::new()).is_none());
    }

    #[test]
    fn replace_instance_collapses_region() {
        let badge = InstanceId::new();
        let card = InstanceId::new();
        let mut root = tree(badge, card);

        let reference = MarkupNode::Reference {
            name: "Badge".to_string(),
            props: Props::new(),
        };
        let replaced = root.replace_instance(badge, &reference);
        assert_eq!(replaced, 1);
        assert!(root.to_string().contains("<Badge/>"));
    }

    #[test]
    fn replace_missing_instance_is_noop() {
        let badge = InstanceId::new();
        let card = InstanceId::new();
        let mut root = tree(badge, card);
        let before = root.clone();

        let replaced = root.replace_instance(InstanceId::new(), &MarkupNode::text("x"));
        assert_eq!(replaced, 0);
        assert_eq!(root, before);
    }

    #[test]
    fn display_renders_markup() {
        let badge = InstanceId::new();
        let card = InstanceId::new();
        let root = tree(badge, card);
        assert_eq!(
            root.to_string(),
            "<div class=\"card\"><span>New</span></div>"
        );
    }
}
