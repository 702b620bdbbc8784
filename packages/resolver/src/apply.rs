//! Override application.
//!
//! Patches are applied onto a resolved clone by relative address. Object
//! patches go through the node's JSON projection so nested values
//! (`{x,y}` vectors) overwrite wholesale; only keys on the node kind's
//! allow-list are honored, everything else is ignored for forward/backward
//! schema compatibility. Application is idempotent.

use serde_json::{Map, Value};
use tracing::debug;

use stencil_document::{ComponentRecord, ComponentRegistry, DocumentNode, OverrideSet, TemplateId};

use crate::errors::ResolveWarning;
use crate::resolved::{node_at_mut, AddressMap, ResolvedNode};

pub struct ObjectPatchResult {
    /// False when the patch values did not fit the node schema and the
    /// node was left untouched.
    pub applied: bool,
    /// Keys outside the node kind's allow-list.
    pub ignored_keys: Vec<String>,
}

/// Overwrite allow-listed keys of `node` with the patch values.
pub fn apply_object_patch(node: &mut DocumentNode, patch: &Map<String, Value>) -> ObjectPatchResult {
    let allowed = node.patchable_keys();

    let mut ignored_keys = Vec::new();
    let mut updates: Vec<(&String, &Value)> = Vec::new();
    for (key, value) in patch {
        if allowed.contains(&key.as_str()) {
            updates.push((key, value));
        } else {
            ignored_keys.push(key.clone());
        }
    }

    if updates.is_empty() {
        return ObjectPatchResult {
            applied: true,
            ignored_keys,
        };
    }

    let Ok(Value::Object(mut projection)) = serde_json::to_value(&*node) else {
        return ObjectPatchResult {
            applied: false,
            ignored_keys,
        };
    };
    for (key, value) in updates {
        projection.insert(key.clone(), value.clone());
    }

    match serde_json::from_value::<DocumentNode>(Value::Object(projection)) {
        Ok(updated) => {
            *node = updated;
            ObjectPatchResult {
                applied: true,
                ignored_keys,
            }
        }
        Err(_) => ObjectPatchResult {
            applied: false,
            ignored_keys,
        },
    }
}

/// Overwrite allow-listed properties of one component. `id` and
/// `component_type` are identity and never patchable.
pub fn apply_component_override<R: ComponentRegistry>(
    component: &mut ComponentRecord,
    patch: &Map<String, Value>,
    registry: &R,
) -> Vec<String> {
    let allowed = registry.allowed_keys(&component.component_type);

    let mut ignored_keys = Vec::new();
    for (key, value) in patch {
        let patchable = key != "id"
            && key != "component_type"
            && allowed.is_some_and(|keys| keys.contains(&key.as_str()));
        if patchable {
            component.properties.insert(key.clone(), value.clone());
        } else {
            ignored_keys.push(key.clone());
        }
    }
    ignored_keys
}

/// Apply a whole override set onto a resolved clone. Targets are relative
/// addresses looked up through the template's address map; entries whose
/// target no longer resolves are skipped with a warning and the rest of
/// the set still applies.
pub fn apply_override_set<R: ComponentRegistry>(
    root: &mut ResolvedNode,
    overrides: &OverrideSet,
    addresses: &AddressMap,
    registry: &R,
    template_id: &TemplateId,
    warnings: &mut Vec<ResolveWarning>,
) {
    for entry in overrides.merged_objects() {
        let target_key = entry.target.to_key();
        let Some(node) = addresses
            .get(&target_key)
            .and_then(|path| node_at_mut(root, path))
        else {
            warnings.push(ResolveWarning::OverrideTargetMissing {
                template_id: template_id.clone(),
                target: target_key,
            });
            continue;
        };

        let result = apply_object_patch(&mut node.content, &entry.patch);
        if !result.applied {
            warnings.push(ResolveWarning::InvalidOverridePatch {
                target: target_key.clone(),
                detail: "patch values do not fit the node schema".to_string(),
            });
        }
        for key in result.ignored_keys {
            debug!(target = %target_key, key = %key, "ignoring unrecognized patch key");
            warnings.push(ResolveWarning::InvalidOverridePatch {
                target: target_key.clone(),
                detail: format!("unknown key `{}`", key),
            });
        }
    }

    for entry in overrides.merged_components() {
        let target_key = entry.target.to_key();
        let component = addresses
            .get(&target_key)
            .and_then(|path| node_at_mut(root, path))
            .and_then(|node| node.content.components_mut())
            .and_then(|components| {
                components
                    .iter_mut()
                    .find(|component| component.id == entry.component_id)
            });
        let Some(component) = component else {
            warnings.push(ResolveWarning::OverrideTargetMissing {
                template_id: template_id.clone(),
                target: format!("{}#{}", target_key, entry.component_id),
            });
            continue;
        };

        for key in apply_component_override(component, &entry.patch, registry) {
            warnings.push(ResolveWarning::InvalidOverridePatch {
                target: format!("{}#{}", target_key, entry.component_id),
                detail: format!("unknown key `{}`", key),
            });
        }
    }
}
