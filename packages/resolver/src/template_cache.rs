//! Resolved template cache.
//!
//! Memoizes fully resolved, override-free template trees per template id,
//! together with the relative address map built by flat traversal. Cached
//! trees are immutable gold content behind `Arc`; every consumer clones
//! before patching. Invalidation is explicit and owned by the resolver
//! (which also cascades it to dependent templates).

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use stencil_document::{NodeAddress, TemplateId};

use crate::resolved::{build_address_map, node_at, AddressMap, ResolvedNode};

#[derive(Debug)]
pub struct ResolvedTemplate {
    pub root: ResolvedNode,
    pub addresses: AddressMap,
}

impl ResolvedTemplate {
    pub fn new(root: ResolvedNode) -> Self {
        let addresses = build_address_map(&root);
        Self { root, addresses }
    }

    /// Template node at a relative address.
    pub fn node_at(&self, address: &NodeAddress) -> Option<&ResolvedNode> {
        let path = self.addresses.get(&address.to_key())?;
        node_at(&self.root, path)
    }
}

#[derive(Debug, Default)]
pub struct ResolvedTemplateCache {
    entries: HashMap<TemplateId, Arc<ResolvedTemplate>>,
}

impl ResolvedTemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, template_id: &str) -> Option<Arc<ResolvedTemplate>> {
        self.entries.get(template_id).cloned()
    }

    pub fn insert(&mut self, template_id: TemplateId, template: ResolvedTemplate) -> Arc<ResolvedTemplate> {
        debug!(template_id = %template_id, nodes = template.root.node_count(), "caching resolved template");
        let template = Arc::new(template);
        self.entries.insert(template_id, template.clone());
        template
    }

    pub fn remove(&mut self, template_id: &str) {
        self.entries.remove(template_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
