//! Raw document cache.
//!
//! Memoizes loaded template documents by id so a template is fetched (and
//! awaited) at most once per session. Known-missing ids are cached too —
//! a broken reference must not trigger a re-fetch on every resolve.
//! Documents get their local ids ensured on insert, satisfying the
//! resolver's precondition that every raw node carries a non-empty id.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use stencil_document::{LocalIdAssigner, RawDocument, TemplateId};

#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<TemplateId, Option<Arc<RawDocument>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the id has an entry, present or known-missing.
    pub fn contains(&self, template_id: &str) -> bool {
        self.entries.contains_key(template_id)
    }

    pub fn get(&self, template_id: &str) -> Option<Arc<RawDocument>> {
        self.entries.get(template_id).cloned().flatten()
    }

    pub fn insert(&mut self, mut document: RawDocument) -> Arc<RawDocument> {
        let mut assigner = LocalIdAssigner::new(&document.id);
        assigner.ensure_tree(&mut document.root);

        debug!(template_id = %document.id, "caching raw template document");
        let document = Arc::new(document);
        self.entries
            .insert(document.id.clone(), Some(document.clone()));
        document
    }

    pub fn insert_missing(&mut self, template_id: TemplateId) {
        debug!(template_id = %template_id, "caching missing template marker");
        self.entries.insert(template_id, None);
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
