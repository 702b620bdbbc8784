//! Resolved node trees.
//!
//! A [`ResolvedNode`] tree is the fully materialized form of a document
//! subtree: every instance reference replaced by its template content,
//! every node carrying its structural address. Trees are disposable,
//! cloneable value trees — the resolver's caches hand out immutable gold
//! copies and every consumer clones before patching.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stencil_document::{DocumentNode, NodeAddress, OverrideSet, TemplateId};

/// Instance stamp on the root of expanded template content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMeta {
    /// The placing instance node's local id.
    pub local_id: String,
    pub template_id: TemplateId,
    /// Override set as authored on the instance. Retained so a collapse
    /// can preserve it verbatim when the template is no longer readable.
    pub overrides: OverrideSet,
}

/// Marks a fallback node standing in for content that could not be
/// resolved; surfaced to the UI instead of failing the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveDiagnostic {
    TemplateNotFound { template_id: TemplateId },
    CircularTemplateReference { template_id: TemplateId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNode {
    /// The node's own materialized content. Frame children are carried by
    /// `children` below (one patch site per node); never a PrefabInstance.
    pub content: DocumentNode,
    pub address: NodeAddress,
    #[serde(default)]
    pub children: Vec<ResolvedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<ResolveDiagnostic>,
}

impl ResolvedNode {
    pub fn new(content: DocumentNode, address: NodeAddress) -> Self {
        Self {
            content,
            address,
            children: Vec::new(),
            instance: None,
            diagnostic: None,
        }
    }

    /// Reassemble the fully inlined document tree.
    pub fn to_document(&self) -> DocumentNode {
        let mut node = self.content.clone();
        if let Some(children) = node.children_mut() {
            children.clear();
            children.extend(self.children.iter().map(ResolvedNode::to_document));
        }
        node
    }

    /// Shift every address in this tree under `base`. Used when cloned
    /// template content (relative addresses) is planted at a placement.
    pub fn rebase(&mut self, base: &NodeAddress) {
        self.address = base.join(&self.address);
        for child in &mut self.children {
            child.rebase(base);
        }
    }

    /// Pre-order iteration over the tree.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ResolvedNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ResolvedNode::node_count).sum::<usize>()
    }
}

/// Encoded relative address → child-index path from the tree root.
pub type AddressMap = HashMap<String, Vec<usize>>;

/// Flat traversal building the lookup map for a resolved tree.
pub fn build_address_map(root: &ResolvedNode) -> AddressMap {
    let mut map = AddressMap::new();
    let mut path = Vec::new();
    collect_addresses(root, &mut path, &mut map);
    map
}

fn collect_addresses(node: &ResolvedNode, path: &mut Vec<usize>, map: &mut AddressMap) {
    map.insert(node.address.to_key(), path.clone());
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        collect_addresses(child, path, map);
        path.pop();
    }
}

pub fn node_at<'a>(root: &'a ResolvedNode, path: &[usize]) -> Option<&'a ResolvedNode> {
    let mut node = root;
    for &index in path {
        node = node.children.get(index)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(root: &'a mut ResolvedNode, path: &[usize]) -> Option<&'a mut ResolvedNode> {
    let mut node = root;
    for &index in path {
        node = node.children.get_mut(index)?;
    }
    Some(node)
}
