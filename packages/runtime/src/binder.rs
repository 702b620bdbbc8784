//! Runtime metadata binding.
//!
//! Walks a resolved tree and its freshly materialized runtime counterpart
//! in lockstep (identical traversal order) and stamps each runtime node
//! with `{instance_root, address}`. A resolved node carrying instance meta
//! turns its runtime counterpart into a new instance root: that node's own
//! id becomes the `instance_root` propagated to descendants, until a
//! deeper instance root switches it.
//!
//! Runtime identities are not stable across materializations, so this must
//! be rerun whenever a subtree is freshly materialized (instance creation,
//! snapshot restore).

use tracing::warn;

use stencil_resolver::ResolvedNode;

use crate::stage::{RuntimeMeta, RuntimeNodeId, RuntimeStage};

/// Stamp `root` (freshly materialized from `resolved`) and its subtree.
pub fn bind_meta(stage: &mut RuntimeStage, root: RuntimeNodeId, resolved: &ResolvedNode) {
    bind_node(stage, root, resolved, None);
}

fn bind_node(
    stage: &mut RuntimeStage,
    id: RuntimeNodeId,
    resolved: &ResolvedNode,
    enclosing_root: Option<RuntimeNodeId>,
) {
    let instance_root = if resolved.instance.is_some() {
        Some(id)
    } else {
        enclosing_root
    };

    let children: Vec<RuntimeNodeId> = {
        let Some(node) = stage.node_mut(id) else {
            warn!(id, "runtime node missing during metadata binding");
            return;
        };

        node.meta = instance_root.map(|root_id| RuntimeMeta {
            instance_root: root_id,
            address: resolved.address.clone(),
        });
        node.instance = resolved.instance.clone();
        node.children.clone()
    };

    if children.len() != resolved.children.len() {
        warn!(
            id,
            runtime_children = children.len(),
            resolved_children = resolved.children.len(),
            "runtime tree out of step with resolved tree, binding prefix only"
        );
    }
    for (child_id, child_resolved) in children.iter().zip(&resolved.children) {
        bind_node(stage, *child_id, child_resolved, instance_root);
    }
}
