//! Template storage abstraction.
//!
//! Raw template documents live with the persistence layer and are fetched
//! by template id. Fetching is asynchronous and is the resolver's only
//! suspension point; the in-memory store backs tests and tooling, the
//! directory store reads `<id>.json` files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use stencil_document::{RawDocument, TemplateId};

use crate::errors::StoreError;

pub trait TemplateStore {
    /// Fetch a raw template document. `Ok(None)` means the id is unknown;
    /// `Err` is reserved for transport/decode failures.
    fn read_template_document(
        &self,
        template_id: &TemplateId,
    ) -> impl std::future::Future<Output = Result<Option<RawDocument>, StoreError>> + Send;
}

/// In-memory store. Cloned handles share one backing map so tests can
/// swap a document out from under a running engine.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    documents: Arc<Mutex<HashMap<TemplateId, RawDocument>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: RawDocument) {
        self.documents
            .lock()
            .expect("template store lock")
            .insert(document.id.clone(), document);
    }

    pub fn remove(&self, template_id: &TemplateId) {
        self.documents
            .lock()
            .expect("template store lock")
            .remove(template_id);
    }
}

impl TemplateStore for InMemoryTemplateStore {
    async fn read_template_document(
        &self,
        template_id: &TemplateId,
    ) -> Result<Option<RawDocument>, StoreError> {
        let documents = self.documents.lock().expect("template store lock");
        Ok(documents.get(template_id).cloned())
    }
}

/// Directory-backed store reading `<id>.json` raw documents.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateStore {
    root: PathBuf,
}

impl DirectoryTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, template_id: &str) -> Option<PathBuf> {
        // Ids are opaque strings; refuse anything that could escape the
        // store directory.
        let safe = !template_id.is_empty()
            && !template_id.contains(['/', '\\'])
            && template_id != "."
            && template_id != "..";
        safe.then(|| self.root.join(format!("{}.json", template_id)))
    }
}

impl TemplateStore for DirectoryTemplateStore {
    async fn read_template_document(
        &self,
        template_id: &TemplateId,
    ) -> Result<Option<RawDocument>, StoreError> {
        let Some(path) = self.document_path(template_id) else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let document: RawDocument = serde_json::from_slice(&bytes)?;
        Ok(Some(document))
    }
}
