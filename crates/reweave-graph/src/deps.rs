//! Per-type dependency set algebra
//!
//! `internal_deps(T)`: source-backed types appearing as descendants of every
//! instance of T, excluding anything reachable only through that instance's
//! own props (caller-supplied) and excluding T itself.
//!
//! `all_deps(T)`: transitive closure over descendants' types plus every type
//! reachable through any instance's props, rendered or not.

use reweave_model::{InstanceId, PropValue, Snapshot, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet};

type DepSets = (
    HashMap<TypeId, BTreeSet<TypeId>>,
    HashMap<TypeId, BTreeSet<TypeId>>,
);

pub(crate) fn compute(
    snapshot: &Snapshot,
    source_types: &[TypeId],
    instances_of: &HashMap<TypeId, Vec<InstanceId>>,
    descendants: &HashMap<InstanceId, Vec<InstanceId>>,
    caller_supplied: &HashMap<InstanceId, HashSet<InstanceId>>,
) -> DepSets {
    let mut internal = HashMap::new();
    let mut direct = HashMap::new();

    for &type_id in source_types {
        let empty = Vec::new();
        let ids = instances_of.get(&type_id).unwrap_or(&empty);

        let mut internal_set: Option<BTreeSet<TypeId>> = None;
        let mut direct_set = BTreeSet::new();

        for &instance_id in ids {
            let subtree = descendants.get(&instance_id).map(Vec::as_slice).unwrap_or(&[]);
            let supplied = caller_supplied.get(&instance_id);

            let mut rendered_internal = BTreeSet::new();
            for &descendant in subtree {
                let Some(descendant_instance) = snapshot.instance(descendant) else {
                    continue;
                };
                if !is_source_backed(snapshot, descendant_instance.type_id) {
                    continue;
                }
                direct_set.insert(descendant_instance.type_id);
                let is_supplied = supplied.is_some_and(|s| s.contains(&descendant));
                if !is_supplied {
                    rendered_internal.insert(descendant_instance.type_id);
                }
            }

            // Prop-reachable types count toward all_deps even when the
            // element never rendered.
            if let Some(instance) = snapshot.instance(instance_id) {
                instance.props.walk(&mut |_, value| {
                    if let PropValue::Element(element) = value {
                        if is_source_backed(snapshot, element.type_id) {
                            direct_set.insert(element.type_id);
                        }
                    }
                });
            }

            internal_set = Some(match internal_set.take() {
                None => rendered_internal,
                Some(acc) => acc.intersection(&rendered_internal).copied().collect(),
            });
        }

        let mut internal_set = internal_set.unwrap_or_default();
        internal_set.remove(&type_id);
        internal.insert(type_id, internal_set);

        direct_set.remove(&type_id);
        direct.insert(type_id, direct_set);
    }

    // Transitive closure over the direct relation.
    let mut all: HashMap<TypeId, BTreeSet<TypeId>> = HashMap::new();
    for &type_id in source_types {
        let mut closed = BTreeSet::new();
        let mut frontier: Vec<TypeId> = direct.get(&type_id).into_iter().flatten().copied().collect();
        while let Some(next) = frontier.pop() {
            if next != type_id && closed.insert(next) {
                frontier.extend(direct.get(&next).into_iter().flatten().copied());
            }
        }
        all.insert(type_id, closed);
    }

    (internal, all)
}

fn is_source_backed(snapshot: &Snapshot, type_id: TypeId) -> bool {
    snapshot
        .component_type(type_id)
        .is_some_and(|t| t.is_source_backed())
}
