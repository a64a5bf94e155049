use crate::attempt::FailureReason;
use reweave_graph::CorrelationAmbiguity;
use reweave_model::{InstanceId, NodeStatus, TypeId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One accepted component and where it was persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedComponent {
    /// Type the component regenerates.
    pub type_id: TypeId,
    /// Accepted registry name.
    pub name: String,
    /// Sink path the source was written to.
    pub path: String,
}

/// One failed type and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedType {
    /// The failed type.
    pub type_id: TypeId,
    /// Observed name, or the type id when none exists.
    pub label: String,
    /// Why the attempt loop ended.
    pub reason: FailureReason,
    /// Summary of the last validation report, when one exists.
    pub last_report: Option<String>,
}

/// A type that never became ready (a descendant failed or stayed pending).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedType {
    /// The blocked type.
    pub type_id: TypeId,
    /// Observed name, or the type id when none exists.
    pub label: String,
}

/// What a run produced. Nothing is silently dropped: every source-backed
/// type appears in exactly one of the three buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Components committed to the registry.
    pub accepted: Vec<AcceptedComponent>,
    /// Types whose rewrite was exhausted, with reasons.
    pub failed: Vec<FailedType>,
    /// Types a failed descendant kept unscheduled.
    pub blocked: Vec<BlockedType>,
    /// Correlation ties surfaced during graph derivation.
    pub ambiguities: Vec<CorrelationAmbiguity>,
    /// Extraction degradations (unplaced regions, truncated examples).
    pub notes: Vec<String>,
    /// Final per-instance statuses.
    pub statuses: BTreeMap<InstanceId, NodeStatus>,
}

impl RunReport {
    /// Whether every source-backed type was accepted.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accepted, {} failed, {} blocked",
            self.accepted.len(),
            self.failed.len(),
            self.blocked.len()
        )?;
        for failed in &self.failed {
            write!(f, "\n  failed {}: {}", failed.label, failed.reason)?;
        }
        for blocked in &self.blocked {
            write!(f, "\n  blocked {}", blocked.label)?;
        }
        Ok(())
    }
}
