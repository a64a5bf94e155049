//! Static rendering
//!
//! One pass, no state, no effects: a template plus props yields markup.
//! Dependency invocations are resolved against the module set and emitted
//! as opaque references carrying their evaluated props, mirroring how the
//! engine's working tree represents accepted regions. Anything the template
//! asks for that the props cannot answer is captured as a warning; rendering
//! never panics and never crashes the run.

use crate::compile::{AttrPart, AttrValue, Template, TemplateNode};
use crate::modules::ModuleSet;
use reweave_model::{MarkupElement, MarkupNode, PropPath, PropValue, Props};
use serde::{Deserialize, Serialize};

/// A problem observed while evaluating a usage expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeWarning {
    /// The template read a prop the invocation did not supply.
    #[error("prop `{path}` is not present")]
    MissingProp {
        /// The unanswered path.
        path: PropPath,
    },

    /// A structured value landed where only text fits.
    #[error("prop `{path}` has no text form here")]
    NonTextValue {
        /// Path of the offending value.
        path: PropPath,
    },

    /// The template invoked a component outside the module set.
    #[error("unknown component <{name}>")]
    UnknownComponent {
        /// The unresolved component name.
        name: String,
    },
}

/// Result of rendering one usage expression.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    /// Rendered root nodes.
    pub nodes: Vec<MarkupNode>,
    /// Everything captured during evaluation; any entry blocks acceptance.
    pub warnings: Vec<RuntimeWarning>,
}

/// Render `template` against `props`.
pub fn render(template: &Template, props: &Props, modules: &ModuleSet) -> RenderOutput {
    let mut out = RenderOutput {
        nodes: Vec::new(),
        warnings: Vec::new(),
    };
    let mut nodes = Vec::new();
    render_nodes(&template.roots, props, modules, &mut nodes, &mut out.warnings);
    out.nodes = nodes;
    out
}

fn render_nodes(
    nodes: &[TemplateNode],
    props: &Props,
    modules: &ModuleSet,
    out: &mut Vec<MarkupNode>,
    warnings: &mut Vec<RuntimeWarning>,
) {
    for node in nodes {
        match node {
            TemplateNode::Text(text) => out.push(MarkupNode::Text(text.clone())),
            TemplateNode::Expr(path) => match props.get(path) {
                None => warnings.push(RuntimeWarning::MissingProp { path: path.clone() }),
                Some(value) => value_to_nodes(path, value, out, warnings),
            },
            TemplateNode::Element { tag, attrs, children } => {
                let mut element = MarkupElement::new(tag.clone());
                for (name, value) in attrs {
                    if let Some(rendered) = render_attr(value, props, warnings) {
                        element.attrs.insert(name.clone(), rendered);
                    }
                }
                let mut child_nodes = Vec::new();
                render_nodes(children, props, modules, &mut child_nodes, warnings);
                element.children = child_nodes;
                out.push(MarkupNode::Element(element));
            }
            TemplateNode::Component { name, props: invocation } => {
                if !modules.contains(name) {
                    warnings.push(RuntimeWarning::UnknownComponent { name: name.clone() });
                    continue;
                }
                let mut resolved = Props::new();
                for (prop_name, value) in invocation {
                    match value {
                        AttrValue::Literal(text) => {
                            resolved.0.insert(prop_name.clone(), PropValue::text(text.clone()));
                        }
                        AttrValue::Expr(path) => match props.get(path) {
                            None => {
                                warnings.push(RuntimeWarning::MissingProp { path: path.clone() })
                            }
                            Some(value) => {
                                resolved.0.insert(prop_name.clone(), value.clone());
                            }
                        },
                        AttrValue::Template(parts) => {
                            let text = render_attr_parts(parts, props, warnings);
                            resolved.0.insert(prop_name.clone(), PropValue::Text(text));
                        }
                    }
                }
                out.push(MarkupNode::Reference {
                    name: name.clone(),
                    props: resolved,
                });
            }
        }
    }
}

fn value_to_nodes(
    path: &PropPath,
    value: &PropValue,
    out: &mut Vec<MarkupNode>,
    warnings: &mut Vec<RuntimeWarning>,
) {
    match value {
        PropValue::Null => {}
        PropValue::Bool(b) => out.push(MarkupNode::Text(b.to_string())),
        PropValue::Number(n) => out.push(MarkupNode::Text(format_number(*n))),
        PropValue::Text(s) => out.push(MarkupNode::Text(s.clone())),
        PropValue::Placeholder { path: original } => out.push(MarkupNode::Placeholder {
            path: original.clone(),
        }),
        PropValue::List(items) => {
            for item in items {
                value_to_nodes(path, item, out, warnings);
            }
        }
        PropValue::Map(_) | PropValue::Function { .. } | PropValue::Element(_) => {
            warnings.push(RuntimeWarning::NonTextValue { path: path.clone() });
        }
    }
}

fn render_attr(
    value: &AttrValue,
    props: &Props,
    warnings: &mut Vec<RuntimeWarning>,
) -> Option<String> {
    match value {
        AttrValue::Literal(text) => Some(text.clone()),
        AttrValue::Expr(path) => match props.get(path) {
            None => {
                warnings.push(RuntimeWarning::MissingProp { path: path.clone() });
                None
            }
            Some(value) => value_to_attr_string(path, value, warnings),
        },
        AttrValue::Template(parts) => Some(render_attr_parts(parts, props, warnings)),
    }
}

fn render_attr_parts(
    parts: &[AttrPart],
    props: &Props,
    warnings: &mut Vec<RuntimeWarning>,
) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            AttrPart::Literal(literal) => text.push_str(literal),
            AttrPart::Expr(path) => match props.get(path) {
                None => warnings.push(RuntimeWarning::MissingProp { path: path.clone() }),
                Some(value) => {
                    if let Some(s) = value_to_attr_string(path, value, warnings) {
                        text.push_str(&s);
                    }
                }
            },
        }
    }
    text
}

fn value_to_attr_string(
    path: &PropPath,
    value: &PropValue,
    warnings: &mut Vec<RuntimeWarning>,
) -> Option<String> {
    match value {
        PropValue::Null => None,
        PropValue::Bool(b) => Some(b.to_string()),
        PropValue::Number(n) => Some(format_number(*n)),
        PropValue::Text(s) => Some(s.clone()),
        PropValue::List(_)
        | PropValue::Map(_)
        | PropValue::Function { .. }
        | PropValue::Element(_)
        | PropValue::Placeholder { .. } => {
            warnings.push(RuntimeWarning::NonTextValue { path: path.clone() });
            None
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
