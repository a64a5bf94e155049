use crate::correlate::{self, CorrelatedElement, CorrelationAmbiguity, UncorrelatedElement};
use crate::deps;
use petgraph::graphmap::DiGraphMap;
use reweave_model::{InstanceId, Snapshot, SnapshotError, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Errors raised while deriving the graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// The snapshot violated a structural invariant; fatal to the run.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// All derived relations over one snapshot.
///
/// Built once, immutable afterwards. Derivation is deterministic: instance
/// iteration follows snapshot insertion order and every set with scheduling
/// significance is ordered.
#[derive(Debug)]
pub struct ComponentGraph {
    snapshot: Arc<Snapshot>,
    edges: DiGraphMap<InstanceId, ()>,
    children: HashMap<InstanceId, Vec<InstanceId>>,
    descendants: HashMap<InstanceId, Vec<InstanceId>>,
    depth: HashMap<InstanceId, usize>,
    instances_of: HashMap<TypeId, Vec<InstanceId>>,
    source_types: Vec<TypeId>,
    correlations: HashMap<InstanceId, Vec<CorrelatedElement>>,
    ambiguities: Vec<CorrelationAmbiguity>,
    uncorrelated: Vec<UncorrelatedElement>,
    caller_supplied: HashMap<InstanceId, HashSet<InstanceId>>,
    internal_deps: HashMap<TypeId, BTreeSet<TypeId>>,
    all_deps: HashMap<TypeId, BTreeSet<TypeId>>,
    schedule_depth: HashMap<TypeId, usize>,
}

impl ComponentGraph {
    /// Derive every relation from a validated snapshot.
    pub fn build(snapshot: Arc<Snapshot>) -> Result<Self, GraphError> {
        snapshot.validate()?;

        let mut edges = DiGraphMap::new();
        let mut children: HashMap<InstanceId, Vec<InstanceId>> = HashMap::new();
        for instance in snapshot.instances() {
            edges.add_node(instance.id);
            if let Some(parent) = instance.parent {
                edges.add_edge(parent, instance.id, ());
                children.entry(parent).or_default().push(instance.id);
            }
        }

        if petgraph::algo::is_cyclic_directed(&edges) {
            return Err(GraphError::Snapshot(SnapshotError::ParentCycle(
                snapshot.instances().next().map(|i| i.id).unwrap_or_default(),
            )));
        }

        let root = snapshot.root().map(|r| r.id).ok_or(SnapshotError::MissingRoot)?;

        // Pre-order walk: depth, position, and per-node subtree slices.
        let mut order = Vec::new();
        let mut depth = HashMap::new();
        let mut preorder = HashMap::new();
        let mut subtree_size = HashMap::new();
        walk_preorder(
            root,
            0,
            &children,
            &mut order,
            &mut depth,
            &mut preorder,
            &mut subtree_size,
        );

        let mut descendants = HashMap::new();
        for (&id, &start) in &preorder {
            let size = subtree_size[&id];
            descendants.insert(id, order[start + 1..start + size].to_vec());
        }

        let mut instances_of: HashMap<TypeId, Vec<InstanceId>> = HashMap::new();
        let mut source_types = Vec::new();
        for instance in snapshot.instances() {
            instances_of
                .entry(instance.type_id)
                .or_default()
                .push(instance.id);
            let is_source = snapshot
                .component_type(instance.type_id)
                .is_some_and(|t| t.is_source_backed());
            if is_source && !source_types.contains(&instance.type_id) {
                source_types.push(instance.type_id);
            }
        }
        // Types observed only inside props never have tree instances but are
        // still part of the type universe.
        for component_type in snapshot.types() {
            if component_type.is_source_backed() && !source_types.contains(&component_type.id) {
                source_types.push(component_type.id);
            }
        }

        let correlation = correlate::correlate(&snapshot, &descendants, &depth, &preorder);

        let mut caller_supplied: HashMap<InstanceId, HashSet<InstanceId>> = HashMap::new();
        for (carrier, elements) in &correlation.by_carrier {
            let set = caller_supplied.entry(*carrier).or_default();
            for element in elements {
                set.insert(element.matched);
                if let Some(subtree) = descendants.get(&element.matched) {
                    set.extend(subtree.iter().copied());
                }
            }
        }

        let (internal_deps, all_deps) = deps::compute(
            &snapshot,
            &source_types,
            &instances_of,
            &descendants,
            &caller_supplied,
        );

        let mut schedule_depth = HashMap::new();
        for (&type_id, ids) in &instances_of {
            let max = ids.iter().filter_map(|id| depth.get(id)).copied().max();
            schedule_depth.insert(type_id, max.unwrap_or(0));
        }

        tracing::debug!(
            instances = order.len(),
            source_types = source_types.len(),
            ambiguities = correlation.ambiguities.len(),
            "component graph derived"
        );

        Ok(Self {
            snapshot,
            edges,
            children,
            descendants,
            depth,
            instances_of,
            source_types,
            correlations: correlation.by_carrier,
            ambiguities: correlation.ambiguities,
            uncorrelated: correlation.uncorrelated,
            caller_supplied,
            internal_deps,
            all_deps,
            schedule_depth,
        })
    }

    /// The snapshot the relations were derived from.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// A shared handle to the snapshot.
    pub fn snapshot_arc(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Parent instance, if any.
    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.snapshot.instance(id).and_then(|i| i.parent)
    }

    /// Direct children in document order.
    pub fn children(&self, id: InstanceId) -> &[InstanceId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ancestor chain, nearest first.
    pub fn ancestors(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// Descendants in pre-order.
    pub fn descendants(&self, id: InstanceId) -> &[InstanceId] {
        self.descendants.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth from the root (the root itself is 0).
    pub fn depth(&self, id: InstanceId) -> usize {
        self.depth.get(&id).copied().unwrap_or(0)
    }

    /// Tree instances of a type, first-seen order.
    pub fn instances_of(&self, type_id: TypeId) -> &[InstanceId] {
        self.instances_of
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Source-backed types, first-seen order.
    pub fn source_types(&self) -> &[TypeId] {
        &self.source_types
    }

    /// Embedded-element correlations carried by `instance`.
    pub fn correlations(&self, instance: InstanceId) -> &[CorrelatedElement] {
        self.correlations
            .get(&instance)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every correlation tie observed while classifying embedded elements.
    pub fn ambiguities(&self) -> &[CorrelationAmbiguity] {
        &self.ambiguities
    }

    /// Embedded elements with no structurally-equal descendant.
    pub fn uncorrelated(&self) -> &[UncorrelatedElement] {
        &self.uncorrelated
    }

    /// Instances of `carrier`'s subtree that were supplied through its own
    /// props (matched descendants plus their whole subtrees).
    pub fn caller_supplied(&self, carrier: InstanceId) -> Option<&HashSet<InstanceId>> {
        self.caller_supplied.get(&carrier)
    }

    /// Types `type_id` renders itself, never supplied by a caller.
    pub fn internal_deps(&self, type_id: TypeId) -> &BTreeSet<TypeId> {
        static EMPTY: BTreeSet<TypeId> = BTreeSet::new();
        self.internal_deps.get(&type_id).unwrap_or(&EMPTY)
    }

    /// Every source-backed type reachable from `type_id`, rendered or not.
    pub fn all_deps(&self, type_id: TypeId) -> &BTreeSet<TypeId> {
        static EMPTY: BTreeSet<TypeId> = BTreeSet::new();
        self.all_deps.get(&type_id).unwrap_or(&EMPTY)
    }

    /// Scheduling key: depth of the type's deepest instance. Deeper types
    /// are attempted first.
    pub fn schedule_depth(&self, type_id: TypeId) -> usize {
        self.schedule_depth.get(&type_id).copied().unwrap_or(0)
    }

    /// Descendant instances whose status gates `instance`'s type: the
    /// subtree minus caller-supplied regions, restricted to source-backed
    /// instances of other types.
    pub fn blocking_descendants(&self, instance: InstanceId) -> Vec<InstanceId> {
        let own_type = match self.snapshot.instance(instance) {
            Some(i) => i.type_id,
            None => return Vec::new(),
        };
        let supplied = self.caller_supplied.get(&instance);
        self.descendants(instance)
            .iter()
            .copied()
            .filter(|id| supplied.map_or(true, |s| !s.contains(id)))
            .filter(|id| {
                self.snapshot.instance(*id).is_some_and(|d| {
                    d.type_id != own_type
                        && self
                            .snapshot
                            .component_type(d.type_id)
                            .is_some_and(|t| t.is_source_backed())
                })
            })
            .collect()
    }

    /// Number of instances in the observed tree.
    pub fn instance_count(&self) -> usize {
        self.edges.node_count()
    }
}

fn walk_preorder(
    id: InstanceId,
    level: usize,
    children: &HashMap<InstanceId, Vec<InstanceId>>,
    order: &mut Vec<InstanceId>,
    depth: &mut HashMap<InstanceId, usize>,
    preorder: &mut HashMap<InstanceId, usize>,
    subtree_size: &mut HashMap<InstanceId, usize>,
) -> usize {
    let position = order.len();
    order.push(id);
    depth.insert(id, level);
    preorder.insert(id, position);

    let mut size = 1;
    if let Some(kids) = children.get(&id) {
        for &child in kids {
            size += walk_preorder(child, level + 1, children, order, depth, preorder, subtree_size);
        }
    }
    subtree_size.insert(id, size);
    size
}
