//! Template compilation
//!
//! HTML5 parsing is delegated to html5ever; since that pipeline lowercases
//! unknown tags and knows nothing about `{...}` expressions, a regex
//! pre-pass first rewrites expressions into opaque markers and capitalized
//! component tags into a marked element carrying the original name. The
//! resulting DOM is then walked into the [`Template`] IR.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;
use reweave_model::PropPath;
use std::collections::HashMap;

static EXPR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\[[0-9]+\]|\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\}").unwrap());
static SELF_CLOSING_COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)((?:[^>'\x22]|'[^']*'|\x22[^\x22]*\x22)*?)\s*/>").unwrap());
static OPEN_COMPONENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)").unwrap());
static CLOSE_COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</([A-Z][A-Za-z0-9]*)\s*>").unwrap());
static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__RW_EXPR_([0-9]+)__").unwrap());

const COMPONENT_TAG: &str = "rw-component";
const COMPONENT_NAME_ATTR: &str = "data-rw-name";

/// Compilation failure; reported to the oracle as its own error kind,
/// distinct from a semantic mismatch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The template has no content.
    #[error("template for {0} is empty")]
    EmptyTemplate(String),

    /// A `{...}` expression is not a valid prop path.
    #[error("invalid prop path `{0}`")]
    InvalidPath(String),

    /// A brace survived expression rewriting.
    #[error("unbalanced expression near `{0}`")]
    UnbalancedExpression(String),

    /// The HTML parser rejected the normalized template.
    #[error("template parse failed: {0}")]
    Parse(String),

    /// A component invocation carries child markup.
    #[error("component <{0}> does not take children")]
    ComponentChildren(String),

    /// Two modules were loaded under one name.
    #[error("module `{0}` is already loaded")]
    DuplicateModule(String),

    /// The template invokes a component no module provides.
    #[error("unresolved dependency reference <{0}>")]
    UnresolvedDependency(String),
}

/// Attribute value piece.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrPart {
    /// Literal text
    Literal(String),
    /// `{path}` interpolation
    Expr(PropPath),
}

/// A compiled attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Plain literal value
    Literal(String),
    /// Whole value is one `{path}` interpolation
    Expr(PropPath),
    /// Mixed literal/expression string, e.g. `class="item {kind}"`.
    Template(Vec<AttrPart>),
}

/// Compiled template node.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Platform element.
    Element {
        /// Element tag name.
        tag: String,
        /// Attributes in source order.
        attrs: Vec<(String, AttrValue)>,
        /// Child nodes in source order.
        children: Vec<TemplateNode>,
    },
    /// Literal text.
    Text(String),
    /// `{path}` in node position; rendered by value kind.
    Expr(PropPath),
    /// Dependency component invocation.
    Component {
        /// Invoked component name.
        name: String,
        /// Props passed to the invocation.
        props: Vec<(String, AttrValue)>,
    },
}

/// A compiled, loadable module.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Component name the module loads under.
    pub name: String,
    /// Root nodes of the template body.
    pub roots: Vec<TemplateNode>,
    /// Component names this template invokes.
    pub deps: Vec<String>,
    /// Prop paths this template reads.
    pub props_used: Vec<PropPath>,
}

impl Template {
    /// Stable one-line signature of the props this component consumes;
    /// handed to the oracle when the component acts as a dependency.
    pub fn public_signature(&self) -> String {
        let mut names: Vec<String> = self
            .props_used
            .iter()
            .filter_map(|p| p.segments().first().map(|s| match s {
                reweave_model::PathSegment::Key(k) => k.clone(),
                reweave_model::PathSegment::Index(i) => i.to_string(),
            }))
            .collect();
        names.sort();
        names.dedup();
        format!("({})", names.join(", "))
    }
}

/// Compile `source` into a loadable [`Template`] named `name`.
pub fn compile(name: &str, source: &str) -> Result<Template, CompileError> {
    let (normalized, expressions) = normalize(source)?;

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut normalized.as_bytes())
        .map_err(|err| CompileError::Parse(err.to_string()))?;
    let body = find_body(&dom.document)
        .ok_or_else(|| CompileError::EmptyTemplate(name.to_string()))?;

    let mut roots = lower_children(&body, &expressions)?;
    // Leading/trailing inter-element whitespace is parse noise, not content.
    while matches!(roots.first(), Some(TemplateNode::Text(t)) if t.trim().is_empty()) {
        roots.remove(0);
    }
    while matches!(roots.last(), Some(TemplateNode::Text(t)) if t.trim().is_empty()) {
        roots.pop();
    }
    if roots.is_empty() {
        return Err(CompileError::EmptyTemplate(name.to_string()));
    }

    let mut deps = Vec::new();
    let mut props_used = Vec::new();
    collect_refs(&roots, &mut deps, &mut props_used);
    deps.sort();
    deps.dedup();
    props_used.sort();
    props_used.dedup();

    tracing::trace!(name, deps = deps.len(), props = props_used.len(), "compiled template");

    Ok(Template {
        name: name.to_string(),
        roots,
        deps,
        props_used,
    })
}

/// Rewrite `{path}` expressions into opaque markers and component tags into
/// marked `rw-component` elements so html5ever preserves them.
fn normalize(source: &str) -> Result<(String, HashMap<usize, PropPath>), CompileError> {
    let mut expressions = HashMap::new();
    let mut next = 0usize;

    let replaced = EXPR_RE.replace_all(source, |caps: &regex::Captures<'_>| {
        let path_text = caps[1].to_string();
        let marker = format!("__RW_EXPR_{next}__");
        expressions.insert(next, path_text);
        next += 1;
        marker
    });

    // A brace that survived the expression pass is malformed input, not
    // literal text.
    if let Some(pos) = replaced.find(['{', '}']) {
        let end = (pos + 24).min(replaced.len());
        return Err(CompileError::UnbalancedExpression(
            replaced[pos..end].to_string(),
        ));
    }

    let mut parsed = HashMap::new();
    for (idx, text) in expressions {
        let path: PropPath = text
            .parse()
            .map_err(|_| CompileError::InvalidPath(text.clone()))?;
        parsed.insert(idx, path);
    }

    let with_closed = SELF_CLOSING_COMPONENT_RE.replace_all(&replaced, "<${1}${2}></${1}>");
    let with_open = OPEN_COMPONENT_RE.replace_all(
        &with_closed,
        format!("<{COMPONENT_TAG} {COMPONENT_NAME_ATTR}=\"${{1}}\"").as_str(),
    );
    let marked = CLOSE_COMPONENT_RE
        .replace_all(&with_open, format!("</{COMPONENT_TAG}>").as_str())
        .into_owned();

    Ok((marked, parsed))
}

fn find_body(document: &Handle) -> Option<Handle> {
    let html = document
        .children
        .borrow()
        .iter()
        .find(|n| is_element(n, "html"))
        .cloned()?;
    let body = html
        .children
        .borrow()
        .iter()
        .find(|n| is_element(n, "body"))
        .cloned()?;
    Some(body)
}

fn is_element(handle: &Handle, tag: &str) -> bool {
    matches!(&handle.data, NodeData::Element { name, .. } if name.local.as_ref() == tag)
}

fn lower_node(
    handle: &Handle,
    expressions: &HashMap<usize, PropPath>,
) -> Result<Option<TemplateNode>, CompileError> {
    match &handle.data {
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            let parts = split_text(&text, expressions)?;
            match parts.len() {
                0 => Ok(None),
                1 => Ok(Some(parts.into_iter().next().unwrap())),
                // Multiple segments surface as a synthetic run; flattened by
                // the caller via lower_children.
                _ => Ok(Some(TemplateNode::Element {
                    tag: String::new(),
                    attrs: Vec::new(),
                    children: parts,
                })),
            }
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref().to_string();
            if tag == COMPONENT_TAG {
                let mut component_name = None;
                let mut props = Vec::new();
                for attr in attrs.borrow().iter() {
                    let attr_name = attr.name.local.as_ref().to_string();
                    let value = attr.value.to_string();
                    if attr_name == COMPONENT_NAME_ATTR {
                        component_name = Some(value);
                    } else {
                        props.push((attr_name, lower_attr(&value, expressions)?));
                    }
                }
                let component_name = component_name
                    .ok_or_else(|| CompileError::UnresolvedDependency(tag.clone()))?;
                for child in handle.children.borrow().iter() {
                    if let NodeData::Text { contents } = &child.data {
                        if contents.borrow().trim().is_empty() {
                            continue;
                        }
                    }
                    return Err(CompileError::ComponentChildren(component_name));
                }
                return Ok(Some(TemplateNode::Component {
                    name: component_name,
                    props,
                }));
            }

            let mut lowered_attrs = Vec::new();
            for attr in attrs.borrow().iter() {
                lowered_attrs.push((
                    attr.name.local.as_ref().to_string(),
                    lower_attr(&attr.value, expressions)?,
                ));
            }
            let children = lower_children(handle, expressions)?;
            Ok(Some(TemplateNode::Element {
                tag,
                attrs: lowered_attrs,
                children,
            }))
        }
        _ => Ok(None),
    }
}

fn lower_children(
    handle: &Handle,
    expressions: &HashMap<usize, PropPath>,
) -> Result<Vec<TemplateNode>, CompileError> {
    let mut children = Vec::new();
    for child in handle.children.borrow().iter() {
        match lower_node(child, expressions)? {
            Some(TemplateNode::Element { tag, children: parts, .. }) if tag.is_empty() => {
                children.extend(parts);
            }
            Some(node) => children.push(node),
            None => {}
        }
    }
    Ok(children)
}

fn split_text(
    text: &str,
    expressions: &HashMap<usize, PropPath>,
) -> Result<Vec<TemplateNode>, CompileError> {
    let mut parts = Vec::new();
    let mut cursor = 0;
    for caps in MARKER_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if whole.start() > cursor {
            parts.push(TemplateNode::Text(text[cursor..whole.start()].to_string()));
        }
        let idx: usize = caps[1]
            .parse()
            .map_err(|_| CompileError::InvalidPath(caps[0].to_string()))?;
        let path = expressions
            .get(&idx)
            .ok_or_else(|| CompileError::InvalidPath(caps[0].to_string()))?;
        parts.push(TemplateNode::Expr(path.clone()));
        cursor = whole.end();
    }
    if cursor < text.len() {
        parts.push(TemplateNode::Text(text[cursor..].to_string()));
    }
    Ok(parts)
}

fn lower_attr(
    value: &str,
    expressions: &HashMap<usize, PropPath>,
) -> Result<AttrValue, CompileError> {
    let parts = split_text(value, expressions)?;
    match parts.as_slice() {
        [] => Ok(AttrValue::Literal(String::new())),
        [TemplateNode::Text(t)] => Ok(AttrValue::Literal(t.clone())),
        [TemplateNode::Expr(p)] => Ok(AttrValue::Expr(p.clone())),
        _ => {
            let mut attr_parts = Vec::new();
            for part in parts {
                match part {
                    TemplateNode::Text(t) => attr_parts.push(AttrPart::Literal(t)),
                    TemplateNode::Expr(p) => attr_parts.push(AttrPart::Expr(p)),
                    _ => {}
                }
            }
            Ok(AttrValue::Template(attr_parts))
        }
    }
}

fn collect_refs(nodes: &[TemplateNode], deps: &mut Vec<String>, props: &mut Vec<PropPath>) {
    for node in nodes {
        match node {
            TemplateNode::Element { attrs, children, .. } => {
                for (_, value) in attrs {
                    collect_attr_refs(value, props);
                }
                collect_refs(children, deps, props);
            }
            TemplateNode::Expr(path) => props.push(path.clone()),
            TemplateNode::Component { name, props: cprops } => {
                deps.push(name.clone());
                for (_, value) in cprops {
                    collect_attr_refs(value, props);
                }
            }
            TemplateNode::Text(_) => {}
        }
    }
}

fn collect_attr_refs(value: &AttrValue, props: &mut Vec<PropPath>) {
    match value {
        AttrValue::Expr(path) => props.push(path.clone()),
        AttrValue::Template(parts) => {
            for part in parts {
                if let AttrPart::Expr(path) = part {
                    props.push(path.clone());
                }
            }
        }
        AttrValue::Literal(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compiles_plain_element() {
        let template = compile("Badge", "<span class=\"badge\">New</span>").unwrap();
        assert_eq!(template.roots.len(), 1);
        match &template.roots[0] {
            TemplateNode::Element { tag, attrs, children } => {
                assert_eq!(tag, "span");
                assert_eq!(attrs[0].0, "class");
                assert_eq!(children, &[TemplateNode::Text("New".to_string())]);
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn compiles_text_interpolation() {
        let template = compile("Badge", "<span>{label}</span>").unwrap();
        match &template.roots[0] {
            TemplateNode::Element { children, .. } => {
                assert_eq!(
                    children,
                    &[TemplateNode::Expr("label".parse().unwrap())]
                );
            }
            other => panic!("unexpected node: {other:?}"),
        }
        assert_eq!(template.props_used, vec!["label".parse().unwrap()]);
    }

    #[test]
    fn compiles_component_invocation() {
        let template =
            compile("Card", "<div><Badge label={label}/>{content}</div>").unwrap();
        assert_eq!(template.deps, vec!["Badge".to_string()]);
        match &template.roots[0] {
            TemplateNode::Element { children, .. } => {
                assert!(matches!(
                    &children[0],
                    TemplateNode::Component { name, props }
                        if name == "Badge" && props.len() == 1
                ));
                assert!(matches!(&children[1], TemplateNode::Expr(_)));
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn compiles_mixed_attribute() {
        let template = compile("Item", "<li class=\"item {kind}\">x</li>").unwrap();
        match &template.roots[0] {
            TemplateNode::Element { attrs, .. } => match &attrs[0].1 {
                AttrValue::Template(parts) => {
                    assert_eq!(parts.len(), 2);
                    assert_eq!(parts[0], AttrPart::Literal("item ".to_string()));
                }
                other => panic!("unexpected attr: {other:?}"),
            },
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn rejects_unbalanced_expression() {
        assert!(matches!(
            compile("Bad", "<div>{label</div>"),
            Err(CompileError::UnbalancedExpression(_))
        ));
    }

    #[test]
    fn rejects_empty_template() {
        assert!(matches!(
            compile("Empty", "   "),
            Err(CompileError::EmptyTemplate(_))
        ));
    }

    #[test]
    fn rejects_component_children() {
        assert!(matches!(
            compile("Card", "<Badge><b>no</b></Badge>"),
            Err(CompileError::ComponentChildren(name)) if name == "Badge"
        ));
    }

    #[test]
    fn public_signature_lists_top_level_props() {
        let template =
            compile("Card", "<div title={meta.title}><Badge label={label}/></div>").unwrap();
        assert_eq!(template.public_signature(), "(label, meta)");
    }
}
