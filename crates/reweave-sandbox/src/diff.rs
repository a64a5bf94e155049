//! Canonical tree diff
//!
//! Compares two canonical trees and identifies every offending node by its
//! path. Runs only on canonicalized input, so attribute order, class token
//! order, and whitespace never show up as differences.

use crate::canonical::CanonicalNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// An expected node has no counterpart.
    MissingNode {
        /// Label of the missing node.
        expected: String,
    },
    /// A produced node has no counterpart.
    UnexpectedNode {
        /// Label of the surplus node.
        actual: String,
    },
    /// Two elements disagree on tag name.
    TagMismatch {
        /// Expected tag.
        expected: String,
        /// Produced tag.
        actual: String,
    },
    /// The nodes are of different kinds (element vs. text, etc.).
    KindMismatch {
        /// Expected node label.
        expected: String,
        /// Produced node label.
        actual: String,
    },
    /// One attribute differs or is one-sided.
    AttrMismatch {
        /// Attribute name.
        name: String,
        /// Expected value, if present.
        expected: Option<String>,
        /// Produced value, if present.
        actual: Option<String>,
    },
    /// Two text nodes differ after whitespace collapse.
    TextMismatch {
        /// Expected text.
        expected: String,
        /// Produced text.
        actual: String,
    },
    /// Two component references differ in name or props.
    ReferenceMismatch {
        /// Expected reference rendering.
        expected: String,
        /// Produced reference rendering.
        actual: String,
    },
    /// Two placeholders carry different prop paths.
    PlaceholderMismatch {
        /// Expected path.
        expected: String,
        /// Produced path.
        actual: String,
    },
}

/// A difference anchored at a node path like `/div/span[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Path of the offending node in the expected tree.
    pub path: String,
    /// What differs there.
    pub kind: DiffKind,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiffKind::MissingNode { expected } => {
                write!(f, "{}: missing {expected}", self.path)
            }
            DiffKind::UnexpectedNode { actual } => {
                write!(f, "{}: unexpected {actual}", self.path)
            }
            DiffKind::TagMismatch { expected, actual } => {
                write!(f, "{}: tag {expected} != {actual}", self.path)
            }
            DiffKind::KindMismatch { expected, actual } => {
                write!(f, "{}: expected {expected}, found {actual}", self.path)
            }
            DiffKind::AttrMismatch { name, expected, actual } => write!(
                f,
                "{}: attr {name} {:?} != {:?}",
                self.path, expected, actual
            ),
            DiffKind::TextMismatch { expected, actual } => {
                write!(f, "{}: text {expected:?} != {actual:?}", self.path)
            }
            DiffKind::ReferenceMismatch { expected, actual } => {
                write!(f, "{}: reference {expected} != {actual}", self.path)
            }
            DiffKind::PlaceholderMismatch { expected, actual } => {
                write!(f, "{}: placeholder {expected} != {actual}", self.path)
            }
        }
    }
}

/// Diff two canonical node lists. Empty result means equivalence.
pub fn diff_nodes(expected: &[CanonicalNode], actual: &[CanonicalNode]) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_lists(expected, actual, "", &mut entries);
    entries
}

fn diff_lists(
    expected: &[CanonicalNode],
    actual: &[CanonicalNode],
    path: &str,
    entries: &mut Vec<DiffEntry>,
) {
    let common = expected.len().min(actual.len());
    for i in 0..common {
        diff_node(&expected[i], &actual[i], &child_path(path, &expected[i], i), entries);
    }
    for node in &expected[common..] {
        entries.push(DiffEntry {
            path: path.to_string(),
            kind: DiffKind::MissingNode {
                expected: node.label(),
            },
        });
    }
    for node in &actual[common..] {
        entries.push(DiffEntry {
            path: path.to_string(),
            kind: DiffKind::UnexpectedNode {
                actual: node.label(),
            },
        });
    }
}

fn diff_node(
    expected: &CanonicalNode,
    actual: &CanonicalNode,
    path: &str,
    entries: &mut Vec<DiffEntry>,
) {
    match (expected, actual) {
        (
            CanonicalNode::Element {
                tag: expected_tag,
                attrs: expected_attrs,
                children: expected_children,
            },
            CanonicalNode::Element {
                tag: actual_tag,
                attrs: actual_attrs,
                children: actual_children,
            },
        ) => {
            if expected_tag != actual_tag {
                entries.push(DiffEntry {
                    path: path.to_string(),
                    kind: DiffKind::TagMismatch {
                        expected: expected_tag.clone(),
                        actual: actual_tag.clone(),
                    },
                });
                return;
            }
            let mut names: Vec<&String> = expected_attrs.keys().chain(actual_attrs.keys()).collect();
            names.sort();
            names.dedup();
            for name in names {
                let expected_value = expected_attrs.get(name);
                let actual_value = actual_attrs.get(name);
                if expected_value != actual_value {
                    entries.push(DiffEntry {
                        path: path.to_string(),
                        kind: DiffKind::AttrMismatch {
                            name: name.clone(),
                            expected: expected_value.cloned(),
                            actual: actual_value.cloned(),
                        },
                    });
                }
            }
            diff_lists(expected_children, actual_children, path, entries);
        }
        (CanonicalNode::Text(expected_text), CanonicalNode::Text(actual_text)) => {
            if expected_text != actual_text {
                entries.push(DiffEntry {
                    path: path.to_string(),
                    kind: DiffKind::TextMismatch {
                        expected: expected_text.clone(),
                        actual: actual_text.clone(),
                    },
                });
            }
        }
        (
            CanonicalNode::Reference {
                name: expected_name,
                props: expected_props,
            },
            CanonicalNode::Reference {
                name: actual_name,
                props: actual_props,
            },
        ) => {
            if expected_name != actual_name || expected_props != actual_props {
                entries.push(DiffEntry {
                    path: path.to_string(),
                    kind: DiffKind::ReferenceMismatch {
                        expected: format!("<{expected_name} {expected_props}/>"),
                        actual: format!("<{actual_name} {actual_props}/>"),
                    },
                });
            }
        }
        (
            CanonicalNode::Placeholder { path: expected_slot },
            CanonicalNode::Placeholder { path: actual_slot },
        ) => {
            if expected_slot != actual_slot {
                entries.push(DiffEntry {
                    path: path.to_string(),
                    kind: DiffKind::PlaceholderMismatch {
                        expected: expected_slot.clone(),
                        actual: actual_slot.clone(),
                    },
                });
            }
        }
        _ => entries.push(DiffEntry {
            path: path.to_string(),
            kind: DiffKind::KindMismatch {
                expected: expected.label(),
                actual: actual.label(),
            },
        }),
    }
}

fn child_path(parent: &str, node: &CanonicalNode, index: usize) -> String {
    let label = match node {
        CanonicalNode::Element { tag, .. } => tag.clone(),
        CanonicalNode::Text(_) => "#text".to_string(),
        CanonicalNode::Reference { name, .. } => name.clone(),
        CanonicalNode::Placeholder { .. } => "#slot".to_string(),
    };
    format!("{parent}/{label}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize_all;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use reweave_model::{MarkupElement, MarkupNode};

    fn sample() -> MarkupNode {
        MarkupNode::Element(
            MarkupElement::new("div")
                .with_attr("class", "a b")
                .with_attr("style", "margin: 0px; color: red")
                .with_child(MarkupNode::Element(
                    MarkupElement::new("span").with_child(MarkupNode::text("hi")),
                )),
        )
    }

    #[test]
    fn diff_is_reflexive() {
        let nodes = canonicalize_all(&[sample()]);
        assert!(diff_nodes(&nodes, &nodes).is_empty());
    }

    #[test]
    fn equivalent_serializations_diff_empty() {
        let permuted = MarkupNode::Element(
            MarkupElement::new("div")
                .with_attr("style", "color:red; margin:0")
                .with_attr("class", "b  a")
                .with_child(MarkupNode::text("  "))
                .with_child(MarkupNode::Element(
                    MarkupElement::new("span").with_child(MarkupNode::text(" hi ")),
                )),
        );
        let expected = canonicalize_all(&[sample()]);
        let actual = canonicalize_all(&[permuted]);
        assert_eq!(diff_nodes(&expected, &actual), vec![]);
    }

    #[test]
    fn missing_child_identified() {
        let expected = canonicalize_all(&[sample()]);
        let without_child = MarkupNode::Element(
            MarkupElement::new("div")
                .with_attr("class", "a b")
                .with_attr("style", "margin:0;color:red"),
        );
        let actual = canonicalize_all(&[without_child]);

        let entries = diff_nodes(&expected, &actual);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/div[0]");
        assert!(matches!(
            &entries[0].kind,
            DiffKind::MissingNode { expected } if expected == "<span>"
        ));
    }

    #[test]
    fn changed_tag_identified() {
        let expected = canonicalize_all(&[sample()]);
        let renamed = MarkupNode::Element(
            MarkupElement::new("div")
                .with_attr("class", "a b")
                .with_attr("style", "margin:0;color:red")
                .with_child(MarkupNode::Element(
                    MarkupElement::new("b").with_child(MarkupNode::text("hi")),
                )),
        );
        let actual = canonicalize_all(&[renamed]);

        let entries = diff_nodes(&expected, &actual);
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            &entries[0].kind,
            DiffKind::TagMismatch { expected, actual }
                if expected == "span" && actual == "b"
        ));
        assert_eq!(entries[0].path, "/div[0]/span[0]");
    }

    #[test]
    fn attr_difference_identified() {
        let a = canonicalize_all(&[MarkupNode::Element(
            MarkupElement::new("a").with_attr("href", "/x"),
        )]);
        let b = canonicalize_all(&[MarkupNode::Element(
            MarkupElement::new("a").with_attr("href", "/y"),
        )]);
        let entries = diff_nodes(&a, &b);
        assert!(matches!(
            &entries[0].kind,
            DiffKind::AttrMismatch { name, .. } if name == "href"
        ));
    }

    proptest! {
        // Class-token order and whitespace padding never produce a diff.
        #[test]
        fn prop_token_order_is_insignificant(
            mut tokens in proptest::collection::vec("[a-z]{1,6}", 1..6),
            pad in "[ \t]{0,4}",
        ) {
            let forward = MarkupNode::Element(
                MarkupElement::new("div").with_attr("class", tokens.join(" ")),
            );
            tokens.reverse();
            let reversed = MarkupNode::Element(
                MarkupElement::new("div")
                    .with_attr("class", format!("{pad}{}{pad}", tokens.join("  "))),
            );
            let a = canonicalize_all(&[forward]);
            let b = canonicalize_all(&[reversed]);
            prop_assert!(diff_nodes(&a, &b).is_empty());
        }
    }
}
