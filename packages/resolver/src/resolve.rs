//! Template resolution.
//!
//! Expands a raw document tree into a [`ResolvedNode`] tree: frames and
//! leaves are wrapped with their structural address, instance references
//! are replaced in place by a deep clone of the referenced template's
//! resolved content with the instance's overrides applied.
//!
//! ## Determinism
//!
//! Resolution is fully deterministic: same raw documents in, deep-equal
//! resolved trees out, on every invocation. Caches only memoize what a
//! cold resolve would produce.
//!
//! ## Suspension model
//!
//! Fetching raw documents is the only async boundary. [`TemplateResolver::preload`]
//! walks the transitive closure of template references with an iterative
//! worklist and awaits each first-time fetch; everything after that —
//! including recursive expansion — is synchronous and touches only the
//! caches.
//!
//! ## Recursion protection
//!
//! Template ids on the current resolution path are tracked in an
//! in-progress set. A template that transitively instantiates itself is
//! corrupted authoring data: the offending reference resolves to a
//! fallback node and the rest of the tree still resolves.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use stencil_document::{
    ComponentRegistry, CoreComponents, DocumentNode, InstanceNode, NodeAddress, RawDocument,
    TemplateId, Visitor,
};

use crate::apply::apply_override_set;
use crate::document_cache::DocumentCache;
use crate::errors::{ResolveWarning, TemplateFault};
use crate::graph::DependencyGraph;
use crate::resolved::{InstanceMeta, ResolveDiagnostic, ResolvedNode};
use crate::store::TemplateStore;
use crate::template_cache::{ResolvedTemplate, ResolvedTemplateCache};

/// Whether the tree being resolved is a document opened for editing or a
/// template expanded for reuse. Instance content resolved for reuse gets
/// an entered-template marker so addresses stay unique under double
/// nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Document,
    Template,
}

/// A resolved tree plus everything recovered along the way.
#[derive(Debug)]
pub struct Resolution {
    pub root: ResolvedNode,
    pub warnings: Vec<ResolveWarning>,
}

/// Long-lived resolution service owning the caches. Independent instances
/// (one per session, one per test) share nothing.
pub struct TemplateResolver<R: ComponentRegistry = CoreComponents> {
    documents: DocumentCache,
    templates: ResolvedTemplateCache,
    graph: DependencyGraph,
    in_progress: HashSet<TemplateId>,
    registry: R,
}

impl Default for TemplateResolver<CoreComponents> {
    fn default() -> Self {
        Self::new(CoreComponents)
    }
}

impl<R: ComponentRegistry> TemplateResolver<R> {
    pub fn new(registry: R) -> Self {
        Self {
            documents: DocumentCache::new(),
            templates: ResolvedTemplateCache::new(),
            graph: DependencyGraph::new(),
            in_progress: HashSet::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Fetch the transitive closure of template documents reachable from
    /// `seeds` into the document cache. Ids already cached (present or
    /// known-missing) are not re-fetched or re-awaited. Unknown and
    /// unreadable templates are cached as missing and reported; the
    /// resolve that follows recovers with fallback nodes.
    #[instrument(skip(self, store, seeds))]
    pub async fn preload<S: TemplateStore>(
        &mut self,
        store: &S,
        seeds: impl IntoIterator<Item = TemplateId>,
    ) -> Vec<ResolveWarning> {
        let mut warnings = Vec::new();
        let mut queue: VecDeque<TemplateId> = seeds.into_iter().collect();

        while let Some(template_id) = queue.pop_front() {
            if self.documents.contains(&template_id) {
                continue;
            }

            match store.read_template_document(&template_id).await {
                Ok(Some(document)) => {
                    debug!(template_id = %template_id, "fetched template document");
                    let document = self.documents.insert(document);
                    queue.extend(collect_template_refs(&document.root));
                }
                Ok(None) => {
                    warn!(template_id = %template_id, "template not found in store");
                    self.documents.insert_missing(template_id.clone());
                    warnings.push(ResolveWarning::TemplateNotFound { template_id });
                }
                Err(err) => {
                    warn!(template_id = %template_id, error = %err, "template fetch failed");
                    self.documents.insert_missing(template_id.clone());
                    warnings.push(ResolveWarning::TemplateUnreadable {
                        template_id,
                        detail: err.to_string(),
                    });
                }
            }
        }

        warnings
    }

    /// Expand a document opened for editing. The document's template
    /// closure must be preloaded; every node must carry a local id (the
    /// engine ensures both).
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    pub fn resolve_document(&mut self, document: &RawDocument) -> Resolution {
        info!("resolving document");
        let resolution = self.resolve_fragment(&document.root);
        info!(
            nodes = resolution.root.node_count(),
            warnings = resolution.warnings.len(),
            "document resolved"
        );
        resolution
    }

    /// Expand a standalone subtree in document scope (a freshly created
    /// instance, a pasted fragment). The subtree's template closure must
    /// be preloaded and its nodes must carry local ids.
    pub fn resolve_fragment(&mut self, root: &DocumentNode) -> Resolution {
        let mut warnings = Vec::new();
        let root = self.resolve_node(root, NodeAddress::root(), Scope::Document, &mut warnings);
        Resolution { root, warnings }
    }

    /// The cached raw document for a template, if present.
    pub fn document(&self, template_id: &str) -> Option<Arc<RawDocument>> {
        self.documents.get(template_id)
    }

    /// The cached resolved form of a template, resolving and caching on
    /// miss. Warnings produced by a first-time resolve are appended to
    /// `warnings`; cache hits report nothing new.
    pub fn resolved_template(
        &mut self,
        template_id: &TemplateId,
        warnings: &mut Vec<ResolveWarning>,
    ) -> Result<Arc<ResolvedTemplate>, TemplateFault> {
        if let Some(cached) = self.templates.get(template_id) {
            return Ok(cached);
        }
        if self.in_progress.contains(template_id) {
            return Err(TemplateFault::Circular);
        }
        let Some(document) = self.documents.get(template_id) else {
            return Err(TemplateFault::NotFound);
        };

        debug!(template_id = %template_id, "resolving template for cache");
        self.in_progress.insert(template_id.clone());
        let root = self.resolve_node(
            &document.root,
            NodeAddress::root(),
            Scope::Template,
            warnings,
        );
        self.in_progress.remove(template_id);

        self.graph
            .set_dependencies(template_id.clone(), collect_template_refs(&document.root));
        Ok(self.templates.insert(template_id.clone(), ResolvedTemplate::new(root)))
    }

    fn resolve_node(
        &mut self,
        node: &DocumentNode,
        address: NodeAddress,
        scope: Scope,
        warnings: &mut Vec<ResolveWarning>,
    ) -> ResolvedNode {
        match node {
            DocumentNode::Frame(frame) => {
                let children = frame
                    .children
                    .iter()
                    .map(|child| {
                        self.resolve_node(
                            child,
                            address.child(child.local_id()),
                            scope,
                            warnings,
                        )
                    })
                    .collect();

                let mut content = frame.clone();
                content.children.clear();
                let mut resolved = ResolvedNode::new(DocumentNode::Frame(content), address);
                resolved.children = children;
                resolved
            }
            DocumentNode::Text(_) | DocumentNode::Image(_) | DocumentNode::Shape(_) => {
                ResolvedNode::new(node.clone(), address)
            }
            DocumentNode::PrefabInstance(instance) => {
                self.resolve_instance(instance, address, scope, warnings)
            }
        }
    }

    /// Replace an instance reference with a clone of its template content:
    /// deep-clone the cached gold tree, apply the instance's overrides
    /// against the clone's relative addresses, rebase every address under
    /// the instance's position, overlay the instance's placement onto the
    /// clone root and stamp it with the instance meta.
    fn resolve_instance(
        &mut self,
        instance: &InstanceNode,
        address: NodeAddress,
        scope: Scope,
        warnings: &mut Vec<ResolveWarning>,
    ) -> ResolvedNode {
        let template_id = &instance.prefab_ref.id;

        let template = match self.resolved_template(template_id, warnings) {
            Ok(template) => template,
            Err(TemplateFault::NotFound) => {
                warn!(template_id = %template_id, instance = %instance.base.local_id, "template missing, emitting fallback");
                warnings.push(ResolveWarning::TemplateNotFound {
                    template_id: template_id.clone(),
                });
                return fallback_node(
                    instance,
                    address,
                    ResolveDiagnostic::TemplateNotFound {
                        template_id: template_id.clone(),
                    },
                );
            }
            Err(TemplateFault::Circular) => {
                error!(template_id = %template_id, instance = %instance.base.local_id, "circular template reference, emitting fallback");
                warnings.push(ResolveWarning::CircularTemplateReference {
                    template_id: template_id.clone(),
                });
                return fallback_node(
                    instance,
                    address,
                    ResolveDiagnostic::CircularTemplateReference {
                        template_id: template_id.clone(),
                    },
                );
            }
        };

        // Instances never alias cached storage.
        let mut clone = template.root.clone();

        apply_override_set(
            &mut clone,
            &instance.overrides,
            &template.addresses,
            &self.registry,
            template_id,
            warnings,
        );

        let base = match scope {
            Scope::Document => address,
            Scope::Template => address.entered(template_id.clone()),
        };
        clone.rebase(&base);

        // Placement always wins over anything an override wrote.
        *clone.content.base_mut() = instance.base.clone();

        clone.instance = Some(InstanceMeta {
            local_id: instance.base.local_id.clone(),
            template_id: template_id.clone(),
            overrides: instance.overrides.clone(),
        });
        clone
    }

    /// Drop a template's cached entries — resolved form, raw document and
    /// every transitive dependent's resolved form, which embeds stale
    /// content of this template.
    pub fn invalidate(&mut self, template_id: &TemplateId) {
        let affected = self.graph.dependents_transitive(template_id);
        info!(template_id = %template_id, affected = affected.len(), "invalidating template");
        for id in &affected {
            self.templates.remove(id);
            self.graph.remove(id);
        }
        self.documents.remove(template_id);
    }

    pub fn invalidate_all(&mut self) {
        info!("invalidating all templates");
        self.templates.clear();
        self.documents.clear();
        self.graph.clear();
    }
}

/// Structurally valid placeholder standing in for unresolvable template
/// content. Keeps the instance's placement and meta (including the
/// authored overrides) so a later collapse loses nothing.
fn fallback_node(
    instance: &InstanceNode,
    address: NodeAddress,
    diagnostic: ResolveDiagnostic,
) -> ResolvedNode {
    let mut content = DocumentNode::frame(instance.base.name.clone());
    *content.base_mut() = instance.base.clone();

    let mut resolved = ResolvedNode::new(content, address);
    resolved.instance = Some(InstanceMeta {
        local_id: instance.base.local_id.clone(),
        template_id: instance.prefab_ref.id.clone(),
        overrides: instance.overrides.clone(),
    });
    resolved.diagnostic = Some(diagnostic);
    resolved
}

/// Template ids directly referenced by instance nodes under `root`, in
/// first-appearance order.
pub fn collect_template_refs(root: &DocumentNode) -> Vec<TemplateId> {
    struct RefCollector {
        seen: HashSet<TemplateId>,
        refs: Vec<TemplateId>,
    }

    impl Visitor for RefCollector {
        fn visit_node(&mut self, node: &DocumentNode) {
            if let DocumentNode::PrefabInstance(instance) = node {
                if self.seen.insert(instance.prefab_ref.id.clone()) {
                    self.refs.push(instance.prefab_ref.id.clone());
                }
            }
            stencil_document::walk_node(self, node);
        }
    }

    let mut collector = RefCollector {
        seen: HashSet::new(),
        refs: Vec::new(),
    };
    collector.visit_node(root);
    collector.refs
}
