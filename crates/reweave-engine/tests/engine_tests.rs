use pretty_assertions::assert_eq;
use reweave_engine::{EngineConfig, MemorySink, RewriteEngine};
use reweave_model::{MarkupElement, MarkupNode, NodeStatus, PropValue, Props};
use reweave_oracle::{CachingOracle, MemoryCache, OracleReply, ScriptedOracle};
use reweave_sandbox::Candidate;
use reweave_test_utils::{badge_card_fixture, SnapshotBuilder};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn candidate(name: &str, source: &str) -> OracleReply {
    OracleReply::candidate(Candidate {
        name: name.to_string(),
        description: format!("regenerated {name}"),
        source_text: source.to_string(),
    })
}

#[tokio::test]
async fn end_to_end_badge_card() {
    init_tracing();
    let fixture = badge_card_fixture();

    // Dispatch order is deepest-first, first-seen on ties: Badge, Note, Card.
    let oracle = ScriptedOracle::new()
        .then(candidate("Badge", "<span class=\"badge\">{label}</span>"))
        .then(candidate("Note", "<p>{body}</p>"))
        .then(candidate(
            "Card",
            "<div class=\"card\"><Badge label={label}/>{content}</div>",
        ));

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(fixture.snapshot)).await.unwrap();

    assert!(report.is_complete_success(), "report: {report}");
    assert_eq!(report.accepted.len(), 3);
    assert_eq!(
        report
            .accepted
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>(),
        vec!["Badge", "Note", "Card"]
    );

    let mut files = engine.sink().list().unwrap();
    files.sort();
    assert_eq!(
        files,
        vec![
            "components/Badge.cmp".to_string(),
            "components/Card.cmp".to_string(),
            "components/Note.cmp".to_string(),
        ]
    );

    for (_, status) in &report.statuses {
        assert_eq!(*status, NodeStatus::Valid);
    }
}

#[tokio::test]
async fn card_waits_for_badge() {
    init_tracing();
    let fixture = badge_card_fixture();

    let oracle = ScriptedOracle::new()
        .then(candidate("Badge", "<span class=\"badge\">{label}</span>"))
        .then(candidate("Note", "<p>{body}</p>"))
        .then(candidate(
            "Card",
            "<div class=\"card\"><Badge label={label}/>{content}</div>",
        ));

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(fixture.snapshot)).await.unwrap();
    assert!(report.is_complete_success(), "report: {report}");

    // Card was dispatched last, after its internal dependency resolved.
    let hints = engine.oracle().name_hints();
    assert_eq!(hints[0].as_deref(), Some("Badge"));
    assert_eq!(hints.last().unwrap().as_deref(), Some("Card"));
    assert_eq!(engine.oracle().calls(), 3);
}

#[tokio::test]
async fn failure_blocks_ancestors_not_siblings() {
    init_tracing();
    let fixture = badge_card_fixture();

    // Badge gives up; Note still succeeds; Card can never become ready.
    let oracle = ScriptedOracle::new()
        .then(OracleReply::give_up())
        .then(candidate("Note", "<p>{body}</p>"));

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(fixture.snapshot)).await.unwrap();

    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.accepted[0].name, "Note");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].label, "Badge");
    assert_eq!(report.blocked.len(), 1);
    assert_eq!(report.blocked[0].label, "Card");

    assert_eq!(report.statuses[&fixture.badge], NodeStatus::Invalid);
    assert_eq!(report.statuses[&fixture.note], NodeStatus::Valid);
    assert_eq!(report.statuses[&fixture.card], NodeStatus::Pending);
}

#[tokio::test]
async fn exhaustion_fails_after_bounded_attempts() {
    init_tracing();
    let mut builder = SnapshotBuilder::new();
    let badge_type = builder.source_type("Badge", "var b=(p)=>h('span',{},p.label)");
    let badge = builder.instance(
        badge_type,
        None,
        Props::new().with("label", PropValue::text("New")),
    );
    let markup = MarkupNode::Element(
        MarkupElement::new("span")
            .with_instance(badge)
            .with_child(MarkupNode::text("New")),
    );
    let snapshot = builder.finish(markup);

    let wrong = || candidate("Badge", "<b>{label}</b>");
    let oracle = ScriptedOracle::new().then(wrong()).then(wrong()).then(wrong());

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(snapshot)).await.unwrap();

    assert_eq!(report.accepted.len(), 0);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0]
        .reason
        .to_string()
        .contains("3 attempt(s)"));
    assert!(report.failed[0].last_report.is_some());
}

#[tokio::test]
async fn unsatisfiable_examples_mark_instances_skipped() {
    init_tracing();
    let mut builder = SnapshotBuilder::new();
    let list_type = builder.primitive("ul");
    let chip_type = builder.source_type("Chip", "var c=(p)=>h('em',{},p.label)");

    let list = builder.instance(list_type, None, Props::new());
    let plain = builder.instance(
        chip_type,
        Some(list),
        Props::new().with("label", PropValue::text("a")),
    );
    let odd = builder.instance(
        chip_type,
        Some(list),
        Props::new().with("label", PropValue::text("b")),
    );

    let markup = MarkupNode::Element(
        MarkupElement::new("ul")
            .with_instance(list)
            .with_child(MarkupNode::Element(
                MarkupElement::new("em")
                    .with_instance(plain)
                    .with_child(MarkupNode::text("a")),
            ))
            .with_child(MarkupNode::Element(
                MarkupElement::new("em")
                    .with_instance(odd)
                    // Does not match what the template could produce.
                    .with_child(MarkupNode::text("client-altered")),
            )),
    );
    let snapshot = builder.finish(markup);

    let oracle = ScriptedOracle::new().then(OracleReply {
        candidate: Some(Candidate {
            name: "Chip".to_string(),
            description: "chip".to_string(),
            source_text: "<em>{label}</em>".to_string(),
        }),
        unsatisfiable: vec![1],
    });

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(snapshot)).await.unwrap();

    assert_eq!(report.accepted.len(), 1, "report: {report}");
    assert_eq!(report.statuses[&plain], NodeStatus::Valid);
    assert_eq!(report.statuses[&odd], NodeStatus::Skipped);
}

#[tokio::test]
async fn cached_oracle_keeps_engine_deterministic() {
    init_tracing();
    let fixture = badge_card_fixture();

    let scripted = ScriptedOracle::new()
        .then(candidate("Badge", "<span class=\"badge\">{label}</span>"))
        .then(candidate("Note", "<p>{body}</p>"))
        .then(candidate(
            "Card",
            "<div class=\"card\"><Badge label={label}/>{content}</div>",
        ));
    let oracle = CachingOracle::new(scripted, MemoryCache::new(64));

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(fixture.snapshot)).await.unwrap();
    assert!(report.is_complete_success(), "report: {report}");
}

#[tokio::test]
async fn duplicate_observed_names_get_unique_registry_names() {
    init_tracing();
    let mut builder = SnapshotBuilder::new();
    let wrap_type = builder.primitive("div");
    // Two distinct definitions observed under the same name.
    let first_type = builder.source_type("Badge", "var a=()=>h('b')");
    let second_type = builder.source_type("Badge", "var b=()=>h('i')");

    let wrap = builder.instance(wrap_type, None, Props::new());
    let first = builder.instance(first_type, Some(wrap), Props::new());
    let second = builder.instance(second_type, Some(wrap), Props::new());

    let markup = MarkupNode::Element(
        MarkupElement::new("div")
            .with_instance(wrap)
            .with_child(MarkupNode::Element(
                MarkupElement::new("b").with_instance(first),
            ))
            .with_child(MarkupNode::Element(
                MarkupElement::new("i").with_instance(second),
            )),
    );
    let snapshot = builder.finish(markup);

    let oracle = ScriptedOracle::new()
        .then(candidate("Badge", "<b></b>"))
        .then(candidate("Badge", "<i></i>"));

    let engine = RewriteEngine::new(oracle, MemorySink::new(), EngineConfig::new());
    let report = engine.run(Arc::new(snapshot)).await.unwrap();

    assert_eq!(report.accepted.len(), 2, "report: {report}");
    let mut names: Vec<_> = report.accepted.iter().map(|a| a.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Badge".to_string(), "Badge2".to_string()]);
}
