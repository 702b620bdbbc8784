//! Override behavior through full resolution: precedence, isolation,
//! idempotency, recovery.

use serde_json::{json, Map, Value};

use stencil_document::{
    ComponentRecord, DocumentNode, NodeAddress, OverrideSet, RawDocument, Vec2,
};

use crate::errors::ResolveWarning;
use crate::resolve::TemplateResolver;
use crate::resolved::ResolvedNode;
use crate::store::InMemoryTemplateStore;

fn patch(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn button_template() -> RawDocument {
    RawDocument::new(
        "tpl-button",
        "Button",
        DocumentNode::frame("Button")
            .with_local_id("button-root")
            .with_child(
                DocumentNode::text("Label", "Click")
                    .with_local_id("label")
                    .with_component(
                        ComponentRecord::new("fx", "effect").with_property("radius", json!(4.0)),
                    ),
            ),
    )
}

async fn resolver_with(templates: Vec<RawDocument>) -> TemplateResolver {
    let store = InMemoryTemplateStore::new();
    let seeds: Vec<_> = templates.iter().map(|t| t.id.clone()).collect();
    for template in templates {
        store.insert(template);
    }
    let mut resolver = TemplateResolver::default();
    resolver.preload(&store, seeds).await;
    resolver
}

fn label_content(clone_root: &ResolvedNode) -> &str {
    match &clone_root.children[0].content {
        DocumentNode::Text(text) => &text.content,
        other => panic!("expected Text, got {}", other.kind_name()),
    }
}

fn home_with_button(overrides: OverrideSet) -> RawDocument {
    RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(
                DocumentNode::instance("Button#1", "tpl-button", "Button")
                    .with_local_id("b1")
                    .with_overrides(overrides),
            ),
    )
}

#[tokio::test]
async fn test_object_override_applies_to_instance_only() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy"))]),
    );

    let resolution = resolver.resolve_document(&home_with_button(overrides));
    assert!(resolution.warnings.is_empty());
    assert_eq!(label_content(&resolution.root.children[0]), "Buy");

    // The cached template still reads "Click".
    let mut warnings = Vec::new();
    let template = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_content(&template.root), "Click");
}

#[tokio::test]
async fn test_duplicate_targets_merge_last_wins() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy")), ("color", json!("#ff0000"))]),
    );
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy Now"))]),
    );

    let resolution = resolver.resolve_document(&home_with_button(overrides));
    let label = &resolution.root.children[0].children[0];
    match &label.content {
        DocumentNode::Text(text) => {
            assert_eq!(text.content, "Buy Now");
            assert_eq!(text.color, "#ff0000");
        }
        other => panic!("expected Text, got {}", other.kind_name()),
    }
}

#[tokio::test]
async fn test_applying_a_set_twice_equals_once() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy")), ("font_size", json!(18.0))]),
    );
    overrides.push_component(
        NodeAddress::root().child("label"),
        "fx",
        patch(&[("radius", json!(9.0))]),
    );

    let mut warnings = Vec::new();
    let template = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();

    let mut once = template.root.clone();
    crate::apply::apply_override_set(
        &mut once,
        &overrides,
        &template.addresses,
        resolver.registry(),
        &"tpl-button".to_string(),
        &mut warnings,
    );
    let mut twice = once.clone();
    crate::apply::apply_override_set(
        &mut twice,
        &overrides,
        &template.addresses,
        resolver.registry(),
        &"tpl-button".to_string(),
        &mut warnings,
    );

    assert_eq!(once, twice);
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn test_component_override_through_resolution() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_component(
        NodeAddress::root().child("label"),
        "fx",
        patch(&[("radius", json!(12.0))]),
    );

    let resolution = resolver.resolve_document(&home_with_button(overrides));
    assert!(resolution.warnings.is_empty());

    let label = &resolution.root.children[0].children[0];
    let component = &label.content.components()[0];
    assert_eq!(component.properties["radius"], json!(12.0));
}

#[tokio::test]
async fn test_placement_wins_over_root_override() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    // A root-targeted override may patch kind keys, but placement comes
    // from the instance node itself.
    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root(),
        patch(&[
            ("position", json!({ "x": 999.0, "y": 999.0 })),
            ("clip", json!(true)),
        ]),
    );

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home").with_local_id("home").with_child(
            DocumentNode::instance("Button#1", "tpl-button", "Button")
                .with_local_id("b1")
                .with_position(10.0, 20.0)
                .with_overrides(overrides),
        ),
    );

    let resolution = resolver.resolve_document(&document);
    let clone_root = &resolution.root.children[0];
    match &clone_root.content {
        DocumentNode::Frame(frame) => {
            assert_eq!(frame.base.position, Vec2::new(10.0, 20.0));
            assert!(frame.clip);
        }
        other => panic!("expected Frame, got {}", other.kind_name()),
    }
}

#[tokio::test]
async fn test_stale_target_is_skipped_and_rest_applies() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("renamed-away"),
        patch(&[("content", json!("lost"))]),
    );
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy"))]),
    );

    let resolution = resolver.resolve_document(&home_with_button(overrides));
    assert!(matches!(
        resolution.warnings.as_slice(),
        [ResolveWarning::OverrideTargetMissing { .. }]
    ));
    assert_eq!(label_content(&resolution.root.children[0]), "Buy");
}

#[tokio::test]
async fn test_unknown_patch_key_is_reported_and_ignored() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("label"),
        patch(&[("content", json!("Buy")), ("hover_glow", json!(true))]),
    );

    let resolution = resolver.resolve_document(&home_with_button(overrides));
    assert!(matches!(
        resolution.warnings.as_slice(),
        [ResolveWarning::InvalidOverridePatch { .. }]
    ));
    assert_eq!(label_content(&resolution.root.children[0]), "Buy");
}

#[tokio::test]
async fn test_deep_override_does_not_leak_into_sibling_instances() {
    // A embeds B; the document also places B directly. An override on A's
    // instance that reaches inside B must not affect the standalone B.
    let b = RawDocument::new(
        "tpl-b",
        "B",
        DocumentNode::frame("B")
            .with_local_id("b-root")
            .with_child(DocumentNode::text("BLabel", "default").with_local_id("b-label")),
    );
    let a = RawDocument::new(
        "tpl-a",
        "A",
        DocumentNode::frame("A")
            .with_local_id("a-root")
            .with_child(DocumentNode::instance("B", "tpl-b", "B").with_local_id("a-b")),
    );
    let mut resolver = resolver_with(vec![b, a]).await;

    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("a-b").entered("tpl-b").child("b-label"),
        patch(&[("content", json!("overridden"))]),
    );

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(
                DocumentNode::instance("A#1", "tpl-a", "A")
                    .with_local_id("a1")
                    .with_overrides(overrides),
            )
            .with_child(DocumentNode::instance("B#1", "tpl-b", "B").with_local_id("b1")),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(resolution.warnings.is_empty());

    let a_clone = &resolution.root.children[0];
    let b_inside_a = &a_clone.children[0];
    assert_eq!(label_content_of(b_inside_a), "overridden");

    let standalone_b = &resolution.root.children[1];
    assert_eq!(label_content_of(standalone_b), "default");
}

fn label_content_of(b_clone: &ResolvedNode) -> &str {
    match &b_clone.children[0].content {
        DocumentNode::Text(text) => &text.content,
        other => panic!("expected Text, got {}", other.kind_name()),
    }
}
