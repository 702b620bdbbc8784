//! Engine facade.
//!
//! One long-lived engine per editing session owns the template store
//! handle, the resolver and its caches. The full pipeline is
//! assign ids → preload → resolve → materialize → bind metadata; the
//! inverse folds an edited stage subtree back into a persistable
//! document node.

use tracing::{info, instrument};

use stencil_document::{
    ComponentRegistry, CoreComponents, DocumentNode, LocalIdAssigner, RawDocument, TemplateId,
};
use stencil_resolver::{collect_template_refs, ResolveWarning, TemplateResolver, TemplateStore};

use crate::binder::bind_meta;
use crate::serializer;
use crate::stage::{RuntimeNodeId, RuntimeStage};

/// A materialized document: the stage holding the runtime tree, the root
/// id, and everything recovered along the way.
#[derive(Debug)]
pub struct Expanded {
    pub stage: RuntimeStage,
    pub root: RuntimeNodeId,
    pub warnings: Vec<ResolveWarning>,
}

pub struct Engine<S: TemplateStore, R: ComponentRegistry = CoreComponents> {
    store: S,
    resolver: TemplateResolver<R>,
    /// Issues local ids for nodes the engine synthesizes itself
    /// (fresh instances dropped onto the stage).
    scratch_ids: LocalIdAssigner,
}

impl<S: TemplateStore> Engine<S, CoreComponents> {
    pub fn new(store: S) -> Self {
        Self::with_registry(store, CoreComponents)
    }
}

impl<S: TemplateStore, R: ComponentRegistry> Engine<S, R> {
    pub fn with_registry(store: S, registry: R) -> Self {
        Self {
            store,
            resolver: TemplateResolver::new(registry),
            scratch_ids: LocalIdAssigner::new("runtime-scratch"),
        }
    }

    /// Full pipeline for a document opened for editing. Assigned local ids
    /// persist into the caller's document.
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    pub async fn expand_to_runtime(&mut self, document: &mut RawDocument) -> Expanded {
        let mut assigner = LocalIdAssigner::new(&document.id);
        assigner.ensure_tree(&mut document.root);

        let mut warnings = self
            .resolver
            .preload(&self.store, collect_template_refs(&document.root))
            .await;

        let resolution = self.resolver.resolve_document(document);
        warnings.extend(resolution.warnings);

        let mut stage = RuntimeStage::new();
        let root = stage.materialize(&resolution.root);
        bind_meta(&mut stage, root, &resolution.root);

        info!(nodes = stage.len(), warnings = warnings.len(), "document expanded");
        Expanded {
            stage,
            root,
            warnings,
        }
    }

    /// Materialize a fresh, override-free instance of a template under
    /// `parent` (detached when None). None when the template is unknown.
    #[instrument(skip(self, stage))]
    pub async fn create_instance(
        &mut self,
        stage: &mut RuntimeStage,
        parent: Option<RuntimeNodeId>,
        template_id: &TemplateId,
    ) -> Option<(RuntimeNodeId, Vec<ResolveWarning>)> {
        let mut warnings = self
            .resolver
            .preload(&self.store, [template_id.clone()])
            .await;

        let template_name = self.resolver.document(template_id)?.name.clone();
        let mut instance =
            DocumentNode::instance(template_name.clone(), template_id.clone(), template_name);
        self.scratch_ids.ensure(&mut instance);

        let resolution = self.resolver.resolve_fragment(&instance);
        warnings.extend(resolution.warnings);

        let root = stage.materialize_under(parent, &resolution.root);
        bind_meta(stage, root, &resolution.root);
        Some((root, warnings))
    }

    /// Fold a runtime subtree back into its persistable form. None when
    /// the id is not on the stage. Uses only cached templates — collapse
    /// never suspends.
    pub fn collapse_to_document(
        &mut self,
        stage: &RuntimeStage,
        root: RuntimeNodeId,
    ) -> Option<(DocumentNode, Vec<ResolveWarning>)> {
        serializer::collapse(stage, root, &mut self.resolver)
    }

    pub fn invalidate_template(&mut self, template_id: &TemplateId) {
        self.resolver.invalidate(template_id);
    }

    pub fn invalidate_all_templates(&mut self) {
        self.resolver.invalidate_all();
    }

    pub fn resolver(&self) -> &TemplateResolver<R> {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut TemplateResolver<R> {
        &mut self.resolver
    }
}
