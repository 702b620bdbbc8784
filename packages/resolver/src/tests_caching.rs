//! Cache coherence: gold trees stay immutable, invalidation is explicit
//! and cascades to dependent templates.

use serde_json::json;

use stencil_document::{DocumentNode, NodeAddress, OverrideSet, RawDocument};

use crate::apply::apply_override_set;
use crate::resolve::TemplateResolver;
use crate::store::InMemoryTemplateStore;

fn button_template(label: &str) -> RawDocument {
    RawDocument::new(
        "tpl-button",
        "Button",
        DocumentNode::frame("Button")
            .with_local_id("button-root")
            .with_child(DocumentNode::text("Label", label).with_local_id("label")),
    )
}

fn card_template() -> RawDocument {
    RawDocument::new(
        "tpl-card",
        "Card",
        DocumentNode::frame("Card")
            .with_local_id("card-root")
            .with_child(
                DocumentNode::instance("Button", "tpl-button", "Button")
                    .with_local_id("card-button"),
            ),
    )
}

fn label_text(root: &crate::resolved::ResolvedNode) -> String {
    let mut found = None;
    root.walk(&mut |node| {
        if let DocumentNode::Text(text) = &node.content {
            if found.is_none() {
                found = Some(text.content.clone());
            }
        }
    });
    found.expect("label present")
}

#[tokio::test]
async fn test_repeated_get_yields_deep_equal_trees() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template("Click"));
    let mut resolver = TemplateResolver::default();
    resolver.preload(&store, vec!["tpl-button".to_string()]).await;

    let mut warnings = Vec::new();
    let first = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    let second = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();

    assert_eq!(first.root, second.root);
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn test_patched_clone_does_not_contaminate_cached_original() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template("Click"));
    let mut resolver = TemplateResolver::default();
    resolver.preload(&store, vec!["tpl-button".to_string()]).await;

    let mut warnings = Vec::new();
    let template = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();

    let mut clone = template.root.clone();
    let mut overrides = OverrideSet::default();
    overrides.push_object(
        NodeAddress::root().child("label"),
        [("content".to_string(), json!("Mutated"))].into_iter().collect(),
    );
    apply_override_set(
        &mut clone,
        &overrides,
        &template.addresses,
        resolver.registry(),
        &"tpl-button".to_string(),
        &mut warnings,
    );
    assert_eq!(label_text(&clone), "Mutated");

    // The gold tree is untouched, now and on the next fetch.
    assert_eq!(label_text(&template.root), "Click");
    let again = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&again.root), "Click");
}

#[tokio::test]
async fn test_invalidate_picks_up_backing_document_change() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template("Click"));
    let mut resolver = TemplateResolver::default();
    resolver.preload(&store, vec!["tpl-button".to_string()]).await;

    let mut warnings = Vec::new();
    let before = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&before.root), "Click");

    // Change the backing document. Without invalidation the cache holds.
    store.insert(button_template("Submit"));
    let held = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&held.root), "Click");

    resolver.invalidate(&"tpl-button".to_string());
    resolver.preload(&store, vec!["tpl-button".to_string()]).await;
    let after = resolver
        .resolved_template(&"tpl-button".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&after.root), "Submit");
}

#[tokio::test]
async fn test_invalidation_cascades_to_embedding_templates() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template("Click"));
    store.insert(card_template());
    let mut resolver = TemplateResolver::default();
    resolver
        .preload(&store, vec!["tpl-card".to_string()])
        .await;

    let mut warnings = Vec::new();
    let card = resolver
        .resolved_template(&"tpl-card".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&card.root), "Click");

    // Editing Button must drop Card's cached tree too: it embeds a stale
    // Button clone.
    store.insert(button_template("Submit"));
    resolver.invalidate(&"tpl-button".to_string());
    resolver.preload(&store, vec!["tpl-button".to_string()]).await;

    let card_after = resolver
        .resolved_template(&"tpl-card".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&card_after.root), "Submit");
}

#[tokio::test]
async fn test_invalidate_all_clears_everything() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template("Click"));
    store.insert(card_template());
    let mut resolver = TemplateResolver::default();
    resolver.preload(&store, vec!["tpl-card".to_string()]).await;

    let mut warnings = Vec::new();
    resolver
        .resolved_template(&"tpl-card".to_string(), &mut warnings)
        .unwrap();

    resolver.invalidate_all();
    assert!(resolver.document("tpl-card").is_none());
    assert!(resolver.document("tpl-button").is_none());

    store.insert(button_template("Fresh"));
    resolver.preload(&store, vec!["tpl-card".to_string()]).await;
    let card = resolver
        .resolved_template(&"tpl-card".to_string(), &mut warnings)
        .unwrap();
    assert_eq!(label_text(&card.root), "Fresh");
}
