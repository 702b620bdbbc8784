//! # Stencil Resolver
//!
//! Expands prefab documents into fully materialized trees and tracks the
//! minimal property overrides layered on top of each template's defaults.
//!
//! ## Purpose
//!
//! A document may place reusable templates ("prefabs") any number of
//! times, nested arbitrarily deep. The resolver substitutes every
//! instance reference with a clone of the referenced template's content,
//! applies the instance's override set, and threads a structural address
//! through every node so the same position can be found again across
//! template boundaries — including diamond reuse of one template.
//!
//! ## Data flow
//!
//! ```text
//! raw document ──preload──▶ DocumentCache (raw docs, ids ensured)
//!      │                         │
//!      └──resolve_document──▶ TemplateResolver ◀──▶ ResolvedTemplateCache
//!                                │                    (gold trees + address maps)
//!                                ▼
//!                          ResolvedNode tree ──▶ materialization (runtime crate)
//! ```
//!
//! Collapsing edited runtime content back into references + overrides
//! lives in the runtime crate; the [`diff`] module supplies its patches.
//!
//! ## Error posture
//!
//! Best-effort, never block the user: missing templates, circular
//! references, stale override targets and unknown patch keys all recover
//! locally and accumulate as [`ResolveWarning`]s beside the result.

pub mod apply;
pub mod diff;
pub mod document_cache;
pub mod errors;
pub mod graph;
pub mod resolve;
pub mod resolved;
pub mod store;
pub mod template_cache;

#[cfg(test)]
mod tests_resolution;

#[cfg(test)]
mod tests_overrides;

#[cfg(test)]
mod tests_caching;

pub use apply::{apply_component_override, apply_object_patch, apply_override_set};
pub use diff::{
    build_component_overrides, build_object_override, diff_object_patch, diff_object_patch_keys,
    non_placement_keys,
};
pub use document_cache::DocumentCache;
pub use errors::{ResolveWarning, StoreError, TemplateFault};
pub use graph::DependencyGraph;
pub use resolve::{collect_template_refs, Resolution, Scope, TemplateResolver};
pub use resolved::{
    build_address_map, node_at, node_at_mut, AddressMap, InstanceMeta, ResolveDiagnostic,
    ResolvedNode,
};
pub use store::{DirectoryTemplateStore, InMemoryTemplateStore, TemplateStore};
pub use template_cache::{ResolvedTemplate, ResolvedTemplateCache};
