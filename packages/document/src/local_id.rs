//! Local id assignment.
//!
//! Every node in a raw document needs a stable, collision-free local id
//! before resolution: addresses, override targets and runtime metadata all
//! key off it. Ids are assigned once, persisted with the document, and
//! survive reordering and renaming. Fresh ids are `{seed}-{n}` where the
//! seed is a CRC32 of the owning document id and `n` is retried against
//! the walk's seen-set, so an id is never handed out twice even when
//! documents were hand-edited.

use crc32fast::Hasher;
use std::collections::HashSet;

use crate::node::DocumentNode;
use crate::visitor::{walk_node_mut, VisitorMut};

/// Derive the id seed for a document. The scheme prefix keeps seeds from
/// colliding with ids hashed from plain file paths.
pub fn document_seed(document_id: &str) -> String {
    let mut buff = String::from(document_id);
    if !document_id.starts_with("template://") {
        buff = format!("template://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Walks a raw document and guarantees unique, non-empty local ids.
pub struct LocalIdAssigner {
    seed: String,
    count: u32,
    seen: HashSet<String>,
}

impl LocalIdAssigner {
    pub fn new(document_id: &str) -> Self {
        Self::from_seed(document_seed(document_id))
    }

    pub fn from_seed(seed: String) -> Self {
        Self {
            seed,
            count: 0,
            seen: HashSet::new(),
        }
    }

    /// Assign a fresh id if the node has none or its id was already seen
    /// in this walk; otherwise record the existing id as seen. An already
    /// unique id is never reassigned.
    pub fn ensure(&mut self, node: &mut DocumentNode) {
        let current = node.base().local_id.clone();
        if !current.is_empty() && self.seen.insert(current) {
            return;
        }

        let fresh = loop {
            self.count += 1;
            let candidate = format!("{}-{}", self.seed, self.count);
            if !self.seen.contains(&candidate) {
                break candidate;
            }
        };
        self.seen.insert(fresh.clone());
        node.base_mut().local_id = fresh;
    }

    /// Depth-first, containers before children, in source order. Instance
    /// nodes get their own id only — ids inside the referenced template
    /// belong to that template's document.
    pub fn ensure_tree(&mut self, root: &mut DocumentNode) {
        self.visit_node_mut(root);
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl VisitorMut for LocalIdAssigner {
    fn visit_node_mut(&mut self, node: &mut DocumentNode) {
        self.ensure(node);
        walk_node_mut(self, node);
    }
}
