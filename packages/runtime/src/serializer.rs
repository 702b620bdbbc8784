//! Instance collapse.
//!
//! Folds an edited runtime subtree back into its persistable form. An
//! instance root becomes an instance reference plus a freshly diffed
//! override set — only properties that differ from the cached template
//! defaults are recorded. Everything else becomes a structural copy with
//! serialized children. This is the left-inverse of resolution + override
//! application for allow-listed keys; transient runtime-only state the
//! allow-lists don't track is dropped.

use tracing::{debug, warn};

use stencil_document::{
    ComponentRegistry, DocumentNode, InstanceNode, OverrideSet, PrefabRef,
};
use stencil_resolver::{
    build_component_overrides, diff_object_patch, diff_object_patch_keys, non_placement_keys,
    InstanceMeta, ResolveWarning, TemplateFault, TemplateResolver,
};

use crate::stage::{RuntimeNode, RuntimeNodeId, RuntimeStage};

/// Collapse the subtree at `root` into a document node. None when the id
/// is not on the stage.
pub fn collapse<R: ComponentRegistry>(
    stage: &RuntimeStage,
    root: RuntimeNodeId,
    resolver: &mut TemplateResolver<R>,
) -> Option<(DocumentNode, Vec<ResolveWarning>)> {
    let mut warnings = Vec::new();
    let node = serialize_node(stage, root, resolver, &mut warnings)?;
    Some((node, warnings))
}

fn serialize_node<R: ComponentRegistry>(
    stage: &RuntimeStage,
    id: RuntimeNodeId,
    resolver: &mut TemplateResolver<R>,
    warnings: &mut Vec<ResolveWarning>,
) -> Option<DocumentNode> {
    let node = stage.node(id)?;

    if let Some(instance) = &node.instance {
        if stage.is_instance_root(id) {
            return Some(serialize_instance(stage, node, instance, resolver, warnings));
        }
    }

    let mut content = node.content.clone();
    if let Some(children) = content.children_mut() {
        children.clear();
    }
    for child_id in &node.children {
        let Some(child) = serialize_node(stage, *child_id, resolver, warnings) else {
            continue;
        };
        if let Some(children) = content.children_mut() {
            children.push(child);
        }
    }
    Some(content)
}

/// Emit an instance reference: placement from the runtime root, override
/// set re-diffed against the cached template at matching relative
/// addresses. Descendants belonging to a deeper instance root are opaque
/// to this diff.
fn serialize_instance<R: ComponentRegistry>(
    stage: &RuntimeStage,
    node: &RuntimeNode,
    instance: &InstanceMeta,
    resolver: &mut TemplateResolver<R>,
    warnings: &mut Vec<ResolveWarning>,
) -> DocumentNode {
    let template_id = instance.template_id.clone();
    let template_name = resolver
        .document(&template_id)
        .map(|document| document.name.clone())
        .unwrap_or_else(|| node.content.name().to_string());

    let mut out = InstanceNode {
        base: node.content.base().clone(),
        prefab_ref: PrefabRef {
            id: template_id.clone(),
            name: template_name,
        },
        overrides: OverrideSet::default(),
    };

    let template = match resolver.resolved_template(&template_id, warnings) {
        Ok(template) => template,
        Err(fault) => {
            warn!(template_id = %template_id, "template unavailable during collapse, keeping authored overrides");
            warnings.push(match fault {
                TemplateFault::NotFound => ResolveWarning::TemplateNotFound {
                    template_id: template_id.clone(),
                },
                TemplateFault::Circular => ResolveWarning::CircularTemplateReference {
                    template_id: template_id.clone(),
                },
            });
            out.overrides = instance.overrides.clone();
            return DocumentNode::PrefabInstance(out);
        }
    };

    let Some(root_address) = stage.address(node.id).cloned() else {
        // Unbound subtree; nothing to diff against.
        out.overrides = instance.overrides.clone();
        return DocumentNode::PrefabInstance(out);
    };

    let mut members = Vec::new();
    collect_members(stage, node.id, node.id, &mut members);
    debug!(template_id = %template_id, members = members.len(), "diffing instance against template");

    for member_id in members {
        let Some(member) = stage.node(member_id) else {
            continue;
        };
        let Some(meta) = member.meta.as_ref() else {
            continue;
        };
        let Some(relative) = meta.address.strip_prefix(&root_address) else {
            warnings.push(ResolveWarning::OverrideTargetMissing {
                template_id: template_id.clone(),
                target: meta.address.to_key(),
            });
            continue;
        };
        let Some(base_node) = template.node_at(&relative) else {
            // Template structure changed since this subtree materialized.
            warnings.push(ResolveWarning::OverrideTargetMissing {
                template_id: template_id.clone(),
                target: relative.to_key(),
            });
            continue;
        };

        let patch = if member_id == node.id {
            // Placement keys live on the instance node itself.
            diff_object_patch_keys(
                &base_node.content,
                &member.content,
                non_placement_keys(&member.content),
            )
        } else {
            diff_object_patch(&base_node.content, &member.content)
        };
        if !patch.is_empty() {
            out.overrides.push_object(relative.clone(), patch);
        }

        out.overrides.components.extend(build_component_overrides(
            &relative,
            base_node.content.components(),
            member.content.components(),
            resolver.registry(),
        ));
    }

    DocumentNode::PrefabInstance(out)
}

/// Pre-order ids of nodes belonging to `root_id`'s instance, nested
/// instance roots excluded.
fn collect_members(
    stage: &RuntimeStage,
    root_id: RuntimeNodeId,
    current: RuntimeNodeId,
    out: &mut Vec<RuntimeNodeId>,
) {
    out.push(current);
    for child in stage.children(current) {
        let belongs = stage
            .node(*child)
            .and_then(|node| node.meta.as_ref())
            .is_some_and(|meta| meta.instance_root == root_id);
        if belongs {
            collect_members(stage, root_id, *child, out);
        }
    }
}
