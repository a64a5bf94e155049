//! Embedded element correlation
//!
//! Prop values and the rendered tree are captured independently; an embedded
//! element in an instance's props and the descendant instance it became do
//! not share identity, only structural equality. Correlation matches each
//! embedded element against the closest structurally-equal descendant,
//! breaking depth ties by pre-order position. Ties between structurally
//! identical siblings are surfaced as [`CorrelationAmbiguity`], never
//! resolved silently.

use reweave_model::{InstanceId, PropPath, Snapshot, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One embedded element matched to the descendant instance it became.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedElement {
    /// Instance whose props carry the element.
    pub carrier: InstanceId,
    /// Path of the element inside the carrier's props.
    pub path: PropPath,
    /// Type of the embedded element.
    pub element_type: TypeId,
    /// The matched descendant instance.
    pub matched: InstanceId,
}

/// Several descendants matched one embedded element equally well.
///
/// Recoverable: the first candidate in pre-order is used, quality of the
/// extraction degrades, and the ambiguity is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAmbiguity {
    /// Instance whose props carry the element.
    pub carrier: InstanceId,
    /// Path of the element inside the carrier's props.
    pub path: PropPath,
    /// The tied candidates, pre-order.
    pub candidates: Vec<InstanceId>,
}

impl fmt::Display for CorrelationAmbiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ambiguous correlation at {} of instance {}: {} equal candidates",
            self.path,
            self.carrier,
            self.candidates.len()
        )
    }
}

/// An embedded element with no structurally-equal descendant.
///
/// Typical for render callbacks that were never invoked in this
/// observation; such elements are caller-supplied by definition but have no
/// rendered region to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncorrelatedElement {
    /// Instance whose props carry the element.
    pub carrier: InstanceId,
    /// Path of the element inside the carrier's props.
    pub path: PropPath,
    /// Type of the embedded element.
    pub element_type: TypeId,
}

/// Correlation output for one whole snapshot.
#[derive(Debug, Default)]
pub(crate) struct CorrelationMap {
    pub(crate) by_carrier: HashMap<InstanceId, Vec<CorrelatedElement>>,
    pub(crate) ambiguities: Vec<CorrelationAmbiguity>,
    pub(crate) uncorrelated: Vec<UncorrelatedElement>,
}

/// Correlate every embedded element of every instance.
///
/// `descendants` must yield pre-order instance lists; `depth` is depth from
/// the root. Determinism: snapshot iteration order is insertion order, and
/// candidate ordering is (depth, pre-order index).
pub(crate) fn correlate(
    snapshot: &Snapshot,
    descendants: &HashMap<InstanceId, Vec<InstanceId>>,
    depth: &HashMap<InstanceId, usize>,
    preorder: &HashMap<InstanceId, usize>,
) -> CorrelationMap {
    let mut map = CorrelationMap::default();

    for instance in snapshot.instances() {
        let mut correlated = Vec::new();
        instance.props.for_each_element(|path, element| {
            let empty = Vec::new();
            let pool = descendants.get(&instance.id).unwrap_or(&empty);

            let mut candidates: Vec<InstanceId> = pool
                .iter()
                .copied()
                .filter(|id| {
                    snapshot.instance(*id).is_some_and(|d| {
                        d.type_id == element.type_id && d.props == element.props
                    })
                })
                .collect();
            candidates.sort_by_key(|id| (depth.get(id).copied(), preorder.get(id).copied()));

            match candidates.as_slice() {
                [] => map.uncorrelated.push(UncorrelatedElement {
                    carrier: instance.id,
                    path: path.clone(),
                    element_type: element.type_id,
                }),
                [single] => correlated.push(CorrelatedElement {
                    carrier: instance.id,
                    path: path.clone(),
                    element_type: element.type_id,
                    matched: *single,
                }),
                [first, ..] => {
                    let nearest_depth = depth.get(first).copied();
                    let tied: Vec<InstanceId> = candidates
                        .iter()
                        .copied()
                        .take_while(|id| depth.get(id).copied() == nearest_depth)
                        .collect();
                    if tied.len() > 1 {
                        tracing::warn!(
                            carrier = %instance.id,
                            path = %path,
                            candidates = tied.len(),
                            "ambiguous embedded element correlation"
                        );
                        map.ambiguities.push(CorrelationAmbiguity {
                            carrier: instance.id,
                            path: path.clone(),
                            candidates: tied,
                        });
                    }
                    correlated.push(CorrelatedElement {
                        carrier: instance.id,
                        path: path.clone(),
                        element_type: element.type_id,
                        matched: *first,
                    });
                }
            }
        });
        if !correlated.is_empty() {
            map.by_carrier.insert(instance.id, correlated);
        }
    }

    map
}
