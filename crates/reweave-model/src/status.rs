use serde::{Deserialize, Serialize};

/// Rewrite lifecycle status of one instance of a source-backed type.
///
/// Starts `Pending`. Set to `Valid`/`Skipped` when the type is accepted
/// (skipped = the oracle declared this instance's example unsatisfiable but
/// the type succeeded overall), `Invalid` when the type's rewrite attempt is
/// exhausted. `Invalid` or `Pending` on any descendant blocks its ancestor
/// type from being scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet resolved.
    Pending,
    /// Its type was accepted and this instance's example held.
    Valid,
    /// Its type's rewrite was exhausted without acceptance.
    Invalid,
    /// Its type was accepted but this instance's example was unsatisfiable.
    Skipped,
}

impl NodeStatus {
    /// Whether this status unblocks ancestors.
    pub fn is_resolved_ok(self) -> bool {
        matches!(self, NodeStatus::Valid | NodeStatus::Skipped)
    }

    /// Whether this status permanently blocks ancestors.
    pub fn is_blocking_failure(self) -> bool {
        matches!(self, NodeStatus::Invalid)
    }
}
