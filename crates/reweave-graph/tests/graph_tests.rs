use pretty_assertions::assert_eq;
use proptest::prelude::*;
use reweave_graph::ComponentGraph;
use reweave_model::{
    EmbeddedElement, MarkupElement, MarkupNode, PropValue, Props,
};
use reweave_test_utils::{badge_card_fixture, SnapshotBuilder};
use std::sync::Arc;

#[test]
fn badge_card_dependency_sets() {
    let fixture = badge_card_fixture();
    let graph = ComponentGraph::build(Arc::new(fixture.snapshot)).unwrap();

    let internal = graph.internal_deps(fixture.card_type);
    assert!(internal.contains(&fixture.badge_type));
    assert!(!internal.contains(&fixture.note_type));

    let all = graph.all_deps(fixture.card_type);
    assert!(all.contains(&fixture.badge_type));
    assert!(all.contains(&fixture.note_type));

    assert!(graph.internal_deps(fixture.badge_type).is_empty());
}

#[test]
fn badge_card_caller_supplied_and_blocking() {
    let fixture = badge_card_fixture();
    let graph = ComponentGraph::build(Arc::new(fixture.snapshot)).unwrap();

    let supplied = graph.caller_supplied(fixture.card).unwrap();
    assert!(supplied.contains(&fixture.note));
    assert!(!supplied.contains(&fixture.badge));

    // Only the internally rendered badge gates Card's readiness.
    assert_eq!(graph.blocking_descendants(fixture.card), vec![fixture.badge]);

    let correlations = graph.correlations(fixture.card);
    assert_eq!(correlations.len(), 1);
    assert_eq!(correlations[0].path.to_string(), "content");
    assert_eq!(correlations[0].matched, fixture.note);
    assert!(graph.ambiguities().is_empty());
}

#[test]
fn schedule_depth_prefers_leaves() {
    let fixture = badge_card_fixture();
    let graph = ComponentGraph::build(Arc::new(fixture.snapshot)).unwrap();

    assert!(graph.schedule_depth(fixture.badge_type) > graph.schedule_depth(fixture.card_type));
}

#[test]
fn identical_siblings_reported_ambiguous() {
    let mut builder = SnapshotBuilder::new();
    let item_type = builder.source_type("Item", "var i=()=>h('li')");
    let list_type = builder.source_type("List", "var l=(p)=>h('ul',{},p.lead)");

    let item_props = Props::new().with("label", PropValue::text("same"));
    let list_props = Props::new().with(
        "lead",
        PropValue::Element(EmbeddedElement {
            type_id: item_type,
            props: item_props.clone(),
        }),
    );

    let list = builder.instance(list_type, None, list_props);
    let first = builder.instance(item_type, Some(list), item_props.clone());
    let second = builder.instance(item_type, Some(list), item_props);

    let markup = MarkupNode::Element(
        MarkupElement::new("ul")
            .with_instance(list)
            .with_child(MarkupNode::Element(
                MarkupElement::new("li").with_instance(first),
            ))
            .with_child(MarkupNode::Element(
                MarkupElement::new("li").with_instance(second),
            )),
    );

    let graph = ComponentGraph::build(Arc::new(builder.finish(markup))).unwrap();

    let ambiguities = graph.ambiguities();
    assert_eq!(ambiguities.len(), 1);
    assert_eq!(ambiguities[0].candidates, vec![first, second]);

    // Ties resolve to the earliest pre-order candidate.
    assert_eq!(graph.correlations(list)[0].matched, first);
}

#[test]
fn never_rendered_element_is_uncorrelated_but_in_all_deps() {
    let mut builder = SnapshotBuilder::new();
    let tooltip_type = builder.source_type("Tooltip", "var t=()=>h('div')");
    let button_type = builder.source_type("Button", "var b=(p)=>h('button')");

    let button_props = Props::new().with(
        "tooltip",
        PropValue::Element(EmbeddedElement {
            type_id: tooltip_type,
            props: Props::new().with("text", PropValue::text("hint")),
        }),
    );
    let button = builder.instance(button_type, None, button_props);

    let markup = MarkupNode::Element(MarkupElement::new("button").with_instance(button));
    let graph = ComponentGraph::build(Arc::new(builder.finish(markup))).unwrap();

    assert_eq!(graph.uncorrelated().len(), 1);
    assert_eq!(graph.uncorrelated()[0].element_type, tooltip_type);

    assert!(graph.all_deps(button_type).contains(&tooltip_type));
    assert!(!graph.internal_deps(button_type).contains(&tooltip_type));
}

#[test]
fn descendants_are_preorder() {
    let fixture = badge_card_fixture();
    let graph = ComponentGraph::build(Arc::new(fixture.snapshot)).unwrap();

    assert_eq!(
        graph.descendants(fixture.card),
        &[fixture.badge, fixture.note]
    );
    assert_eq!(graph.ancestors(fixture.badge), vec![fixture.card]);
    assert_eq!(graph.depth(fixture.note), 1);
}

proptest! {
    // Random chains/forests of typed instances: derived sets stay
    // consistent regardless of shape.
    #[test]
    fn prop_internal_deps_subset_of_all_deps(
        parents in proptest::collection::vec(0..8usize, 1..24),
        type_picks in proptest::collection::vec(0..4usize, 1..24),
    ) {
        let mut builder = SnapshotBuilder::new();
        let pool: Vec<_> = (0..4)
            .map(|i| builder.source_type(&format!("T{i}"), "var x=()=>h('div')"))
            .collect();

        let root = builder.instance(pool[0], None, Props::new());
        let mut ids = vec![root];
        let count = parents.len().min(type_picks.len());
        for i in 0..count {
            let parent = ids[parents[i] % ids.len()];
            let type_id = pool[type_picks[i] % pool.len()];
            ids.push(builder.instance(type_id, Some(parent), Props::new()));
        }

        let markup = MarkupNode::Element(MarkupElement::new("div").with_instance(root));
        let snapshot = Arc::new(builder.finish(markup));
        let graph = ComponentGraph::build(Arc::clone(&snapshot)).unwrap();
        let rebuilt = ComponentGraph::build(snapshot).unwrap();

        for &type_id in graph.source_types() {
            let internal = graph.internal_deps(type_id);
            let all = graph.all_deps(type_id);
            prop_assert!(internal.is_subset(all));
            prop_assert!(!internal.contains(&type_id));
            // Determinism across rebuilds.
            prop_assert_eq!(internal, rebuilt.internal_deps(type_id));
            prop_assert_eq!(all, rebuilt.all_deps(type_id));
        }
    }
}
