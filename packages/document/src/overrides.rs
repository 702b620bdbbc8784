//! Override sets persisted on instance nodes.
//!
//! An override records only the properties that differ from a template
//! default at some relative address. Entry order is insignificant;
//! duplicate entries for one target merge last-wins per key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::address::NodeAddress;

/// Object-level patch: allow-listed node properties at `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectOverride {
    pub target: NodeAddress,
    pub patch: Map<String, Value>,
}

/// Component-level patch: properties of one component at `target`,
/// matched by component id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOverride {
    pub target: NodeAddress,
    pub component_id: String,
    pub patch: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSet {
    #[serde(default)]
    pub objects: Vec<ObjectOverride>,
    #[serde(default)]
    pub components: Vec<ComponentOverride>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.components.is_empty()
    }

    pub fn push_object(&mut self, target: NodeAddress, patch: Map<String, Value>) {
        self.objects.push(ObjectOverride { target, patch });
    }

    pub fn push_component(
        &mut self,
        target: NodeAddress,
        component_id: impl Into<String>,
        patch: Map<String, Value>,
    ) {
        self.components.push(ComponentOverride {
            target,
            component_id: component_id.into(),
            patch,
        });
    }

    /// Object entries with duplicate targets merged, later entries winning
    /// per key. First-seen target order is preserved so merging is
    /// deterministic.
    pub fn merged_objects(&self) -> Vec<ObjectOverride> {
        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, ObjectOverride> = HashMap::new();

        for entry in &self.objects {
            let key = entry.target.to_key();
            match merged.get_mut(&key) {
                Some(existing) => {
                    for (k, v) in &entry.patch {
                        existing.patch.insert(k.clone(), v.clone());
                    }
                }
                None => {
                    order.push(key.clone());
                    merged.insert(key, entry.clone());
                }
            }
        }

        order
            .into_iter()
            .map(|key| merged.remove(&key).expect("merged entry"))
            .collect()
    }

    /// Component entries merged per (target, component id), last-wins.
    pub fn merged_components(&self) -> Vec<ComponentOverride> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut merged: HashMap<(String, String), ComponentOverride> = HashMap::new();

        for entry in &self.components {
            let key = (entry.target.to_key(), entry.component_id.clone());
            match merged.get_mut(&key) {
                Some(existing) => {
                    for (k, v) in &entry.patch {
                        existing.patch.insert(k.clone(), v.clone());
                    }
                }
                None => {
                    order.push(key.clone());
                    merged.insert(key, entry.clone());
                }
            }
        }

        order
            .into_iter()
            .map(|key| merged.remove(&key).expect("merged entry"))
            .collect()
    }
}
