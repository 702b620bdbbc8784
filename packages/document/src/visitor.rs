//! Visitor pattern for traversing document trees.
//!
//! Default implementations walk the entire tree in source order,
//! containers before children. Override the `visit_*` methods to act on
//! nodes; call the matching `walk_*` function to keep descending.

use crate::node::{ComponentRecord, DocumentNode};

/// Immutable document traversal.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &DocumentNode) {
        walk_node(self, node);
    }

    fn visit_component(&mut self, _component: &ComponentRecord) {
        // Leaf record, nothing to walk
    }
}

/// Mutable document traversal, used when a pass persists changes into the
/// tree (id assignment, migrations).
pub trait VisitorMut: Sized {
    fn visit_node_mut(&mut self, node: &mut DocumentNode) {
        walk_node_mut(self, node);
    }

    fn visit_component_mut(&mut self, _component: &mut ComponentRecord) {
        // Leaf record, nothing to walk
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &DocumentNode) {
    for component in node.components() {
        visitor.visit_component(component);
    }
    for child in node.children() {
        visitor.visit_node(child);
    }
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut DocumentNode) {
    if let Some(components) = node.components_mut() {
        for component in components {
            visitor.visit_component_mut(component);
        }
    }
    if let Some(children) = node.children_mut() {
        for child in children {
            visitor.visit_node_mut(child);
        }
    }
}
