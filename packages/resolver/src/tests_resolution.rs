//! Resolution structure tests: expansion, addressing, cycle and
//! missing-template recovery.

use std::collections::HashSet;

use stencil_document::{DocumentNode, NodeAddress, RawDocument};

use crate::errors::ResolveWarning;
use crate::resolved::{ResolveDiagnostic, ResolvedNode};
use crate::resolve::TemplateResolver;
use crate::store::InMemoryTemplateStore;

fn button_template() -> RawDocument {
    RawDocument::new(
        "tpl-button",
        "Button",
        DocumentNode::frame("Button")
            .with_local_id("button-root")
            .with_child(DocumentNode::text("Label", "Click").with_local_id("label")),
    )
}

/// Card embeds a Button instance next to its own title.
fn card_template() -> RawDocument {
    RawDocument::new(
        "tpl-card",
        "Card",
        DocumentNode::frame("Card")
            .with_local_id("card-root")
            .with_child(DocumentNode::text("Title", "Card").with_local_id("title"))
            .with_child(
                DocumentNode::instance("Button", "tpl-button", "Button")
                    .with_local_id("card-button"),
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
    let warnings = resolver.preload(&store, seeds).await;
    assert!(warnings.is_empty(), "unexpected preload warnings: {warnings:?}");
    resolver
}

fn collect_addresses(root: &ResolvedNode) -> Vec<String> {
    let mut keys = Vec::new();
    root.walk(&mut |node| keys.push(node.address.to_key()));
    keys
}

fn find<'a>(root: &'a ResolvedNode, name: &str) -> Option<&'a ResolvedNode> {
    let mut found = None;
    root.walk(&mut |node| {
        if node.content.name() == name && found.is_none() {
            found = Some(node);
        }
    });
    found
}

#[tokio::test]
async fn test_instance_replaced_in_place_by_template_content() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::text("Heading", "Welcome").with_local_id("heading"))
            .with_child(
                DocumentNode::instance("Button#1", "tpl-button", "Button").with_local_id("b1"),
            ),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(resolution.warnings.is_empty());

    // Source order preserved; the instance slot now holds the clone root.
    let root = &resolution.root;
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].content.name(), "Heading");

    let clone_root = &root.children[1];
    assert_eq!(clone_root.content.kind_name(), "Frame");
    assert_eq!(clone_root.content.local_id(), "b1");
    assert!(clone_root.instance.is_some());

    let label = &clone_root.children[0];
    match &label.content {
        DocumentNode::Text(text) => assert_eq!(text.content, "Click"),
        other => panic!("expected Text, got {}", other.kind_name()),
    }
    assert_eq!(label.address.to_key(), "b1/label");
}

#[tokio::test]
async fn test_resolving_twice_yields_deep_equal_trees() {
    let mut resolver = resolver_with(vec![button_template(), card_template()]).await;

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("Card#1", "tpl-card", "Card").with_local_id("c1")),
    );

    let first = resolver.resolve_document(&document);
    let second = resolver.resolve_document(&document);
    assert_eq!(first.root, second.root);
}

#[tokio::test]
async fn test_addresses_are_injective_under_diamond_reuse() {
    let mut resolver = resolver_with(vec![button_template(), card_template()]).await;

    // The same Button template reaches the document through two cards and
    // two direct placements.
    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("Card#1", "tpl-card", "Card").with_local_id("c1"))
            .with_child(DocumentNode::instance("Card#2", "tpl-card", "Card").with_local_id("c2"))
            .with_child(DocumentNode::instance("B#1", "tpl-button", "Button").with_local_id("b1"))
            .with_child(DocumentNode::instance("B#2", "tpl-button", "Button").with_local_id("b2")),
    );

    let resolution = resolver.resolve_document(&document);
    let keys = collect_addresses(&resolution.root);
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len(), "duplicate addresses: {keys:?}");

    // Two placements of one template differ in their root prefix.
    let b1 = &resolution.root.children[2];
    let b2 = &resolution.root.children[3];
    assert_ne!(b1.address, b2.address);
    assert_eq!(b1.children[0].address.to_key(), "b1/label");
    assert_eq!(b2.children[0].address.to_key(), "b2/label");
}

#[tokio::test]
async fn test_nested_instances_carry_every_entry_marker() {
    // C is a leaf template; B embeds C; A embeds B.
    let c = RawDocument::new(
        "tpl-c",
        "C",
        DocumentNode::frame("C")
            .with_local_id("c-root")
            .with_child(DocumentNode::text("CLabel", "c").with_local_id("c-label")),
    );
    let b = RawDocument::new(
        "tpl-b",
        "B",
        DocumentNode::frame("B")
            .with_local_id("b-root")
            .with_child(DocumentNode::text("BLabel", "b").with_local_id("b-label"))
            .with_child(DocumentNode::instance("C", "tpl-c", "C").with_local_id("b-c")),
    );
    let a = RawDocument::new(
        "tpl-a",
        "A",
        DocumentNode::frame("A")
            .with_local_id("a-root")
            .with_child(DocumentNode::instance("B", "tpl-b", "B").with_local_id("a-b")),
    );
    let mut resolver = resolver_with(vec![c, b, a]).await;

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("A#1", "tpl-a", "A").with_local_id("a1")),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(resolution.warnings.is_empty());

    let c_label = find(&resolution.root, "CLabel").expect("C content reached");
    assert_eq!(
        c_label.address.to_key(),
        "a1/a-b/@tpl-b/b-c/@tpl-c/c-label"
    );
}

#[tokio::test]
async fn test_missing_template_falls_back_and_rest_resolves() {
    let store = InMemoryTemplateStore::new();
    store.insert(button_template());
    let mut resolver = TemplateResolver::default();
    let preload_warnings = resolver
        .preload(&store, vec!["tpl-button".to_string(), "tpl-ghost".to_string()])
        .await;
    assert!(matches!(
        preload_warnings.as_slice(),
        [ResolveWarning::TemplateNotFound { template_id }] if template_id == "tpl-ghost"
    ));

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("Ghost", "tpl-ghost", "Ghost").with_local_id("g1"))
            .with_child(
                DocumentNode::instance("Button#1", "tpl-button", "Button").with_local_id("b1"),
            ),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(matches!(
        resolution.warnings.as_slice(),
        [ResolveWarning::TemplateNotFound { .. }]
    ));

    let fallback = &resolution.root.children[0];
    assert_eq!(fallback.content.kind_name(), "Frame");
    assert_eq!(fallback.content.local_id(), "g1");
    assert!(matches!(
        fallback.diagnostic,
        Some(ResolveDiagnostic::TemplateNotFound { .. })
    ));

    // The healthy instance next to it still expanded fully.
    assert_eq!(resolution.root.children[1].children.len(), 1);
}

#[tokio::test]
async fn test_self_referential_template_yields_circular_fallback() {
    let recursive = RawDocument::new(
        "tpl-rec",
        "Recursive",
        DocumentNode::frame("Recursive")
            .with_local_id("rec-root")
            .with_child(
                DocumentNode::instance("Again", "tpl-rec", "Recursive").with_local_id("again"),
            ),
    );
    let mut resolver = resolver_with(vec![recursive]).await;

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("R", "tpl-rec", "Recursive").with_local_id("r1")),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(resolution
        .warnings
        .iter()
        .any(|w| matches!(w, ResolveWarning::CircularTemplateReference { .. })));

    // The outer instance expands once; the inner self-reference is the
    // fallback.
    let outer = &resolution.root.children[0];
    assert!(outer.instance.is_some());
    let inner = &outer.children[0];
    assert!(matches!(
        inner.diagnostic,
        Some(ResolveDiagnostic::CircularTemplateReference { .. })
    ));
}

#[tokio::test]
async fn test_indirect_cycle_is_caught() {
    let a = RawDocument::new(
        "tpl-a",
        "A",
        DocumentNode::frame("A")
            .with_local_id("a-root")
            .with_child(DocumentNode::instance("B", "tpl-b", "B").with_local_id("a-b")),
    );
    let b = RawDocument::new(
        "tpl-b",
        "B",
        DocumentNode::frame("B")
            .with_local_id("b-root")
            .with_child(DocumentNode::instance("A", "tpl-a", "A").with_local_id("b-a")),
    );
    let mut resolver = resolver_with(vec![a, b]).await;

    let document = RawDocument::new(
        "doc-1",
        "Home",
        DocumentNode::frame("Home")
            .with_local_id("home")
            .with_child(DocumentNode::instance("A#1", "tpl-a", "A").with_local_id("a1")),
    );

    let resolution = resolver.resolve_document(&document);
    assert!(resolution
        .warnings
        .iter()
        .any(|w| matches!(w, ResolveWarning::CircularTemplateReference { .. })));
}

#[tokio::test]
async fn test_fragment_resolution_for_instance_roots() {
    let mut resolver = resolver_with(vec![button_template()]).await;

    let instance = DocumentNode::instance("Button", "tpl-button", "Button").with_local_id("fresh");
    let resolution = resolver.resolve_fragment(&instance);

    assert!(resolution.warnings.is_empty());
    let root = &resolution.root;
    assert!(root.address.is_root());
    assert_eq!(root.content.local_id(), "fresh");
    assert_eq!(root.children[0].address.to_key(), "label");
}

#[tokio::test]
async fn test_preload_does_not_refetch_known_missing() {
    let store = InMemoryTemplateStore::new();
    let mut resolver = TemplateResolver::default();

    let first = resolver.preload(&store, vec!["tpl-ghost".to_string()]).await;
    assert_eq!(first.len(), 1);

    // Known-missing: no second fetch, no second warning.
    let second = resolver.preload(&store, vec!["tpl-ghost".to_string()]).await;
    assert!(second.is_empty());

    // Even though the store has it now, the negative entry holds until
    // the id is invalidated.
    store.insert(RawDocument::new("tpl-ghost", "Ghost", DocumentNode::frame("Ghost")));
    let third = resolver.preload(&store, vec!["tpl-ghost".to_string()]).await;
    assert!(third.is_empty());
    assert!(resolver.document("tpl-ghost").is_none());

    resolver.invalidate(&"tpl-ghost".to_string());
    let fourth = resolver.preload(&store, vec!["tpl-ghost".to_string()]).await;
    assert!(fourth.is_empty());
    assert!(resolver.document("tpl-ghost").is_some());
}
