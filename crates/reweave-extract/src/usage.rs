use reweave_model::Props;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A component invocation: the candidate's canonical entry point applied to
/// one instance's (placeholder-substituted) props.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageExpression {
    /// Component name the invocation resolves against.
    pub component: String,
    /// Props the component is applied to, placeholders included.
    pub props: Props,
}

impl UsageExpression {
    /// Build an invocation of `component` with `props`.
    pub fn new(component: impl Into<String>, props: Props) -> Self {
        Self {
            component: component.into(),
            props,
        }
    }

    /// Deterministic JSON form; prop maps are ordered, so equal expressions
    /// serialize identically. Fails only on non-finite numbers.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for UsageExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} …/>", self.component)
    }
}
