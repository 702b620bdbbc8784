//! Runtime stage.
//!
//! The stage is the materialized counterpart of a resolved tree: one
//! runtime node per resolved node, structurally 1:1, held in an arena
//! keyed by monotonically increasing ids. Relations are index-based — a
//! node holds its parent id and an ordered child-id list, never object
//! pointers — so subtrees stay cheap to walk, detach and serialize.
//!
//! Runtime ids are not stable across materializations: a re-expanded
//! subtree gets fresh ids, which is why instance metadata must be rebound
//! after every materialization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stencil_document::{DocumentNode, NodeAddress};
use stencil_resolver::{InstanceMeta, ResolvedNode};

pub type RuntimeNodeId = u64;

/// "Which instance, and where": stamped on every runtime node that
/// participates in a template instance, absent otherwise. The editing
/// layer uses it to forbid structural edits on template-owned content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMeta {
    pub instance_root: RuntimeNodeId,
    pub address: NodeAddress,
}

#[derive(Debug, Clone)]
pub struct RuntimeNode {
    pub id: RuntimeNodeId,
    pub parent: Option<RuntimeNodeId>,
    pub children: Vec<RuntimeNodeId>,
    /// Own materialized content; frame children live in `children` above.
    pub content: DocumentNode,
    pub meta: Option<RuntimeMeta>,
    /// Provenance for instance roots: which template this subtree came
    /// from, with the overrides that were authored on the placement.
    pub instance: Option<InstanceMeta>,
}

#[derive(Debug, Default)]
pub struct RuntimeStage {
    nodes: HashMap<RuntimeNodeId, RuntimeNode>,
    next_id: RuntimeNodeId,
}

impl RuntimeStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a resolved tree as a detached subtree, structurally
    /// 1:1. Metadata is not stamped here — run the binder afterwards.
    pub fn materialize(&mut self, resolved: &ResolvedNode) -> RuntimeNodeId {
        self.materialize_under(None, resolved)
    }

    /// Materialize and attach under an existing parent.
    pub fn materialize_under(
        &mut self,
        parent: Option<RuntimeNodeId>,
        resolved: &ResolvedNode,
    ) -> RuntimeNodeId {
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.insert(
            id,
            RuntimeNode {
                id,
                parent,
                children: Vec::new(),
                content: resolved.content.clone(),
                meta: None,
                instance: None,
            },
        );

        for child in &resolved.children {
            self.materialize_under(Some(id), child);
        }

        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.push(id);
            }
        }
        id
    }

    pub fn node(&self, id: RuntimeNodeId) -> Option<&RuntimeNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: RuntimeNodeId) -> Option<&mut RuntimeNode> {
        self.nodes.get_mut(&id)
    }

    pub fn content(&self, id: RuntimeNodeId) -> Option<&DocumentNode> {
        self.nodes.get(&id).map(|node| &node.content)
    }

    /// Mutable access to a node's content — the runtime edit surface.
    pub fn content_mut(&mut self, id: RuntimeNodeId) -> Option<&mut DocumentNode> {
        self.nodes.get_mut(&id).map(|node| &mut node.content)
    }

    pub fn children(&self, id: RuntimeNodeId) -> &[RuntimeNodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: RuntimeNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Detach a subtree from its parent and drop every node in it.
    pub fn remove(&mut self, id: RuntimeNodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(parent_id) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|child| *child != id);
            }
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&current) {
                stack.extend(removed.children);
            }
        }
    }

    // Instance queries, consumed by the editing layer.

    /// True when the node sits strictly inside template-owned content —
    /// everything below an instance root is read-only except through
    /// override patches.
    pub fn is_inside_instance(&self, id: RuntimeNodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|node| node.meta.as_ref())
            .is_some_and(|meta| meta.instance_root != id)
    }

    pub fn is_instance_root(&self, id: RuntimeNodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|node| node.meta.as_ref())
            .is_some_and(|meta| meta.instance_root == id)
    }

    pub fn instance_root_id(&self, id: RuntimeNodeId) -> Option<RuntimeNodeId> {
        self.nodes
            .get(&id)?
            .meta
            .as_ref()
            .map(|meta| meta.instance_root)
    }

    pub fn address(&self, id: RuntimeNodeId) -> Option<&NodeAddress> {
        self.nodes
            .get(&id)?
            .meta
            .as_ref()
            .map(|meta| &meta.address)
    }
}
