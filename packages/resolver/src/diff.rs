//! Override diffing.
//!
//! Computes the minimal patch between a template's defaults and an edited
//! instance. Values compare through the node's JSON projection, so nested
//! plain data (`{x,y}` vectors, component property bags) compares by deep
//! equality and numeric values are in canonical form on both sides. Keys
//! that compare equal are omitted; an empty patch records no override at
//! all, keeping persisted documents minimal.

use serde_json::{Map, Value};

use stencil_document::{
    ComponentOverride, ComponentRecord, ComponentRegistry, DocumentNode, NodeAddress,
    ObjectOverride, PLACEMENT_KEYS,
};

/// Keys diffable on an instance root: the kind's allow-list minus the
/// placement keys, which belong to the instance node itself.
pub fn non_placement_keys(node: &DocumentNode) -> Vec<&'static str> {
    node.patchable_keys()
        .iter()
        .copied()
        .filter(|key| !PLACEMENT_KEYS.contains(key))
        .collect()
}

/// Minimal object patch over the node kind's full allow-list.
pub fn diff_object_patch(base: &DocumentNode, current: &DocumentNode) -> Map<String, Value> {
    diff_object_patch_keys(base, current, current.patchable_keys())
}

/// Minimal object patch over an explicit key set.
pub fn diff_object_patch_keys(
    base: &DocumentNode,
    current: &DocumentNode,
    keys: impl IntoIterator<Item = impl AsRef<str>>,
) -> Map<String, Value> {
    let mut patch = Map::new();

    // A kind change is a structural edit, not a property override.
    if base.kind_name() != current.kind_name() {
        return patch;
    }

    let (Ok(Value::Object(base_map)), Ok(Value::Object(current_map))) =
        (serde_json::to_value(base), serde_json::to_value(current))
    else {
        return patch;
    };

    for key in keys {
        let key = key.as_ref();
        if base_map.get(key) != current_map.get(key) {
            if let Some(value) = current_map.get(key) {
                patch.insert(key.to_string(), value.clone());
            }
        }
    }
    patch
}

/// Object override entry for `address`, or None when nothing differs.
pub fn build_object_override(
    address: NodeAddress,
    base: &DocumentNode,
    current: &DocumentNode,
) -> Option<ObjectOverride> {
    let patch = diff_object_patch(base, current);
    if patch.is_empty() {
        None
    } else {
        Some(ObjectOverride {
            target: address,
            patch,
        })
    }
}

/// Component override entries for one node. Components match by id, not
/// position; components present in `current` but absent from `base` are
/// skipped — adding or removing a component is not expressible as an
/// override.
pub fn build_component_overrides<R: ComponentRegistry>(
    address: &NodeAddress,
    base_components: &[ComponentRecord],
    current_components: &[ComponentRecord],
    registry: &R,
) -> Vec<ComponentOverride> {
    let mut entries = Vec::new();

    for current in current_components {
        let Some(base) = base_components
            .iter()
            .find(|candidate| candidate.id == current.id)
        else {
            continue;
        };
        let Some(allowed) = registry.allowed_keys(&current.component_type) else {
            continue;
        };

        let mut patch = Map::new();
        for key in allowed {
            if base.properties.get(*key) != current.properties.get(*key) {
                if let Some(value) = current.properties.get(*key) {
                    patch.insert(key.to_string(), value.clone());
                }
            }
        }

        if !patch.is_empty() {
            entries.push(ComponentOverride {
                target: address.clone(),
                component_id: current.id.clone(),
                patch,
            });
        }
    }

    entries
}
