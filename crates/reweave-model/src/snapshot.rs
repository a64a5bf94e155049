//! The immutable snapshot input
//!
//! Produced by an external extraction step: code blobs, deduplicated type
//! descriptors, instance records, and the tagged rendered markup tree.
//! [`Snapshot::validate`] enforces the structural invariants everything
//! downstream relies on; a violation aborts the whole run.

use crate::ids::{CodeId, InstanceId, TypeId};
use crate::markup::MarkupNode;
use crate::props::{PropValue, Props};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Raw legacy source text for one or more types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlob {
    /// Content identity of the blob.
    pub id: CodeId,
    /// The minified source text as observed.
    pub source: String,
}

/// What a type is: a platform element kind, or a source-backed definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Platform element (no code), e.g. `div`.
    Primitive {
        /// Platform tag name.
        tag: String,
    },
    /// Definition backed by a legacy code blob.
    SourceBacked {
        /// Blob holding the legacy source.
        code_id: CodeId,
        /// Name observed at capture time, when one survived minification.
        observed_name: Option<String>,
    },
}

/// A deduplicated component definition.
///
/// Types are deduplicated by `(kind, code_id)` upstream; repeated instances
/// of one definition share one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentType {
    /// Type identity.
    pub id: TypeId,
    /// Primitive or source-backed.
    pub kind: TypeKind,
}

impl ComponentType {
    /// A platform element type.
    pub fn primitive(tag: impl Into<String>) -> Self {
        Self {
            id: TypeId::new(),
            kind: TypeKind::Primitive { tag: tag.into() },
        }
    }

    /// A type backed by the given legacy code blob.
    pub fn source_backed(code_id: CodeId, observed_name: Option<&str>) -> Self {
        Self {
            id: TypeId::new(),
            kind: TypeKind::SourceBacked {
                code_id,
                observed_name: observed_name.map(str::to_string),
            },
        }
    }

    /// Whether this type has legacy source to rewrite.
    pub fn is_source_backed(&self) -> bool {
        matches!(self.kind, TypeKind::SourceBacked { .. })
    }

    /// The backing code blob, if any.
    pub fn code_id(&self) -> Option<CodeId> {
        match &self.kind {
            TypeKind::SourceBacked { code_id, .. } => Some(*code_id),
            TypeKind::Primitive { .. } => None,
        }
    }

    /// The captured name, if one was observed.
    pub fn observed_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::SourceBacked { observed_name, .. } => observed_name.as_deref(),
            TypeKind::Primitive { .. } => None,
        }
    }
}

/// One occurrence of a type in the observed tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Instance identity.
    pub id: InstanceId,
    /// Parent instance; `None` for the root.
    pub parent: Option<InstanceId>,
    /// The instance's type.
    pub type_id: TypeId,
    /// Prop values observed on this occurrence.
    pub props: Props,
}

/// The engine's immutable input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    codes: IndexMap<CodeId, CodeBlob>,
    types: IndexMap<TypeId, ComponentType>,
    instances: IndexMap<InstanceId, ComponentInstance>,
    /// The originally rendered markup, tagged by producing instance.
    pub markup: MarkupNode,
}

impl Snapshot {
    /// An empty snapshot around the given rendered markup.
    pub fn new(markup: MarkupNode) -> Self {
        Self {
            codes: IndexMap::new(),
            types: IndexMap::new(),
            instances: IndexMap::new(),
            markup,
        }
    }

    /// Register a code blob.
    pub fn add_code(&mut self, code: CodeBlob) {
        self.codes.insert(code.id, code);
    }

    /// Register a type descriptor.
    pub fn add_type(&mut self, component_type: ComponentType) {
        self.types.insert(component_type.id, component_type);
    }

    /// Register an instance record.
    pub fn add_instance(&mut self, instance: ComponentInstance) {
        self.instances.insert(instance.id, instance);
    }

    /// Look up a code blob.
    pub fn code(&self, id: CodeId) -> Option<&CodeBlob> {
        self.codes.get(&id)
    }

    /// Look up a type descriptor.
    pub fn component_type(&self, id: TypeId) -> Option<&ComponentType> {
        self.types.get(&id)
    }

    /// Look up an instance record.
    pub fn instance(&self, id: InstanceId) -> Option<&ComponentInstance> {
        self.instances.get(&id)
    }

    /// All type descriptors, insertion order.
    pub fn types(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.values()
    }

    /// All instance records, insertion order.
    pub fn instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.instances.values()
    }

    /// The unique root instance.
    ///
    /// Only meaningful after [`Self::validate`] succeeded.
    pub fn root(&self) -> Option<&ComponentInstance> {
        self.instances.values().find(|i| i.parent.is_none())
    }

    /// Enforce the snapshot invariants.
    ///
    /// Exactly one root; parent relation acyclic and resolvable; every
    /// referenced type, code blob, and markup instance tag resolvable
    /// (embedded elements included).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let roots: Vec<_> = self
            .instances
            .values()
            .filter(|i| i.parent.is_none())
            .collect();
        if roots.is_empty() {
            return Err(SnapshotError::MissingRoot);
        }
        if roots.len() > 1 {
            return Err(SnapshotError::MultipleRoots(roots.len()));
        }

        for instance in self.instances.values() {
            if let Some(parent) = instance.parent {
                if !self.instances.contains_key(&parent) {
                    return Err(SnapshotError::UnknownParent {
                        instance: instance.id,
                        parent,
                    });
                }
            }
            if !self.types.contains_key(&instance.type_id) {
                return Err(SnapshotError::UnknownType(instance.type_id));
            }
            self.validate_props(&instance.props)?;
            self.check_ancestry(instance)?;
        }

        for component_type in self.types.values() {
            if let Some(code_id) = component_type.code_id() {
                if !self.codes.contains_key(&code_id) {
                    return Err(SnapshotError::UnknownCode(code_id));
                }
            }
        }

        let mut markup_err = None;
        self.markup.walk(&mut |node| {
            if markup_err.is_some() {
                return;
            }
            if let MarkupNode::Element(element) = node {
                if let Some(instance) = element.instance {
                    if !self.instances.contains_key(&instance) {
                        markup_err = Some(SnapshotError::UnknownMarkupInstance(instance));
                    }
                }
            }
        });
        if let Some(err) = markup_err {
            return Err(err);
        }

        Ok(())
    }

    fn validate_props(&self, props: &Props) -> Result<(), SnapshotError> {
        let mut unknown = None;
        props.walk(&mut |_, value| {
            if unknown.is_some() {
                return;
            }
            if let PropValue::Element(element) = value {
                if !self.types.contains_key(&element.type_id) {
                    unknown = Some(element.type_id);
                }
            }
        });
        match unknown {
            Some(type_id) => Err(SnapshotError::UnknownType(type_id)),
            None => Ok(()),
        }
    }

    fn check_ancestry(&self, instance: &ComponentInstance) -> Result<(), SnapshotError> {
        let mut seen = HashSet::from([instance.id]);
        let mut current = instance.parent;
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(SnapshotError::ParentCycle(instance.id));
            }
            current = self.instances.get(&id).and_then(|i| i.parent);
        }
        Ok(())
    }
}

/// Malformed snapshot; fatal to the whole run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    /// No instance without a parent.
    #[error("snapshot has no root instance")]
    MissingRoot,

    /// More than one parentless instance.
    #[error("snapshot has {0} root instances, expected exactly one")]
    MultipleRoots(usize),

    /// An instance's parent id resolves to nothing.
    #[error("instance {instance} references unknown parent {parent}")]
    UnknownParent {
        /// The instance carrying the dangling reference.
        instance: InstanceId,
        /// The missing parent id.
        parent: InstanceId,
    },

    /// An instance or embedded element references a type that was never
    /// registered.
    #[error("unknown type referenced: {0}")]
    UnknownType(TypeId),

    /// A source-backed type references a code blob that was never registered.
    #[error("unknown code blob referenced: {0}")]
    UnknownCode(CodeId),

    /// The parent relation loops.
    #[error("parent chain of instance {0} contains a cycle")]
    ParentCycle(InstanceId),

    /// A markup element is tagged with an id no instance record carries.
    #[error("markup tagged with unknown instance {0}")]
    UnknownMarkupInstance(InstanceId),
}
