//! Component registry.
//!
//! Components carry open-vocabulary property bags; what the override
//! system may patch on them is decided per component type by a registry
//! the host editor supplies. `id` and `component_type` are identity, never
//! patchable.

use serde_json::{json, Map, Value};

pub trait ComponentRegistry {
    /// Patchable property keys for a component type, or None when the type
    /// is unknown to this registry (its properties are then opaque and no
    /// key may be patched).
    fn allowed_keys(&self, component_type: &str) -> Option<&'static [&'static str]>;

    /// Default property values a freshly added component starts from.
    fn default_properties(&self, component_type: &str) -> Option<Map<String, Value>>;
}

/// Built-in registry for the core component types.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreComponents;

impl ComponentRegistry for CoreComponents {
    fn allowed_keys(&self, component_type: &str) -> Option<&'static [&'static str]> {
        match component_type {
            "constraint" => Some(&["horizontal", "vertical", "margin"]),
            "interaction" => Some(&["trigger", "action", "target"]),
            "effect" => Some(&["effect_kind", "radius", "color", "offset"]),
            _ => None,
        }
    }

    fn default_properties(&self, component_type: &str) -> Option<Map<String, Value>> {
        let defaults = match component_type {
            "constraint" => json!({
                "horizontal": "left",
                "vertical": "top",
                "margin": 0.0,
            }),
            "interaction" => json!({
                "trigger": "click",
                "action": "none",
                "target": "",
            }),
            "effect" => json!({
                "effect_kind": "shadow",
                "radius": 4.0,
                "color": "#00000040",
                "offset": { "x": 0.0, "y": 2.0 },
            }),
            _ => return None,
        };

        match defaults {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}
