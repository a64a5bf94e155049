use reweave_graph::ComponentGraph;
use reweave_model::{InstanceId, NodeStatus};
use std::collections::HashMap;

/// Per-instance status arena.
///
/// Owned by the run loop; tasks never see it. Ownership of a type's
/// instances transfers scheduler → task → scheduler through dispatch and
/// commit, which is what makes the map safe without locks.
#[derive(Debug)]
pub struct StatusArena {
    statuses: HashMap<InstanceId, NodeStatus>,
}

impl StatusArena {
    /// Every instance of a source-backed type starts `Pending`.
    pub fn new(graph: &ComponentGraph) -> Self {
        let mut statuses = HashMap::new();
        for &type_id in graph.source_types() {
            for &instance in graph.instances_of(type_id) {
                statuses.insert(instance, NodeStatus::Pending);
            }
        }
        Self { statuses }
    }

    /// Current status of `instance`, if tracked.
    pub fn get(&self, instance: InstanceId) -> Option<NodeStatus> {
        self.statuses.get(&instance).copied()
    }

    /// Record a status; called only by the committing loop.
    pub fn set(&mut self, instance: InstanceId, status: NodeStatus) {
        self.statuses.insert(instance, status);
    }

    /// Whether `instance` unblocks its ancestors.
    pub fn is_resolved_ok(&self, instance: InstanceId) -> bool {
        self.get(instance).is_some_and(NodeStatus::is_resolved_ok)
    }

    /// How many instances currently hold `status`.
    pub fn count(&self, status: NodeStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    /// Every tracked instance with its status.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, NodeStatus)> + '_ {
        self.statuses.iter().map(|(id, status)| (*id, *status))
    }
}
