//! Testing utilities for the reweave workspace
//!
//! Snapshot builders and the shared Badge/Card fixture used across crates.

#![warn(unreachable_pub)]

use reweave_model::{
    CodeBlob, CodeId, ComponentInstance, ComponentType, EmbeddedElement, InstanceId,
    MarkupElement, MarkupNode, PropValue, Props, Snapshot, TypeId,
};

/// Incremental snapshot assembly for tests.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    codes: Vec<CodeBlob>,
    types: Vec<ComponentType>,
    instances: Vec<ComponentInstance>,
}

impl SnapshotBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source-backed type with its legacy source text.
    pub fn source_type(&mut self, observed_name: &str, legacy_source: &str) -> TypeId {
        let code = CodeBlob {
            id: CodeId::new(),
            source: legacy_source.to_string(),
        };
        let component_type = ComponentType::source_backed(code.id, Some(observed_name));
        let type_id = component_type.id;
        self.codes.push(code);
        self.types.push(component_type);
        type_id
    }

    /// Register a primitive platform type.
    pub fn primitive(&mut self, tag: &str) -> TypeId {
        let component_type = ComponentType::primitive(tag);
        let type_id = component_type.id;
        self.types.push(component_type);
        type_id
    }

    /// Register an instance of `type_id` under `parent`.
    pub fn instance(
        &mut self,
        type_id: TypeId,
        parent: Option<InstanceId>,
        props: Props,
    ) -> InstanceId {
        let instance = ComponentInstance {
            id: InstanceId::new(),
            parent,
            type_id,
            props,
        };
        let id = instance.id;
        self.instances.push(instance);
        id
    }

    /// Assemble the snapshot around the given rendered markup.
    pub fn finish(self, markup: MarkupNode) -> Snapshot {
        let mut snapshot = Snapshot::new(markup);
        for code in self.codes {
            snapshot.add_code(code);
        }
        for component_type in self.types {
            snapshot.add_type(component_type);
        }
        for instance in self.instances {
            snapshot.add_instance(instance);
        }
        snapshot
    }
}

/// The end-to-end scenario from the engine's acceptance checklist: leaf
/// `Badge` with no deps, `Card` rendering one `Badge` internally and taking
/// a caller-supplied `Note` through its `content` prop.
#[derive(Debug)]
pub struct BadgeCardFixture {
    /// The assembled snapshot.
    pub snapshot: Snapshot,
    /// Leaf type with no dependencies.
    pub badge_type: TypeId,
    /// Parent type rendering a badge and taking caller-supplied content.
    pub card_type: TypeId,
    /// Type supplied to the card through its `content` prop.
    pub note_type: TypeId,
    /// The root card instance.
    pub card: InstanceId,
    /// The internally rendered badge instance.
    pub badge: InstanceId,
    /// The caller-supplied note instance.
    pub note: InstanceId,
}

/// Build the Badge/Card scenario.
pub fn badge_card_fixture() -> BadgeCardFixture {
    let mut builder = SnapshotBuilder::new();
    let badge_type = builder.source_type("Badge", "var b=(p)=>h('span',{class:'badge'},p.label)");
    let note_type = builder.source_type("Note", "var n=(p)=>h('p',{},p.body)");
    let card_type = builder.source_type(
        "Card",
        "var c=(p)=>h('div',{class:'card'},[b({label:p.label}),p.content])",
    );

    let note_props = Props::new().with("body", PropValue::text("hello"));
    let card_props = Props::new()
        .with("label", PropValue::text("New"))
        .with(
            "content",
            PropValue::Element(EmbeddedElement {
                type_id: note_type,
                props: note_props.clone(),
            }),
        );

    let card = builder.instance(card_type, None, card_props);
    let badge = builder.instance(
        badge_type,
        Some(card),
        Props::new().with("label", PropValue::text("New")),
    );
    let note = builder.instance(note_type, Some(card), note_props);

    let markup = MarkupNode::Element(
        MarkupElement::new("div")
            .with_instance(card)
            .with_attr("class", "card")
            .with_child(MarkupNode::Element(
                MarkupElement::new("span")
                    .with_instance(badge)
                    .with_attr("class", "badge")
                    .with_child(MarkupNode::text("New")),
            ))
            .with_child(MarkupNode::Element(
                MarkupElement::new("p")
                    .with_instance(note)
                    .with_child(MarkupNode::text("hello")),
            )),
    );

    BadgeCardFixture {
        snapshot: builder.finish(markup),
        badge_type,
        card_type,
        note_type,
        card,
        badge,
        note,
    }
}
