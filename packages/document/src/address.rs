//! Structural node addresses.
//!
//! An address identifies a node's position in a resolved tree and stays
//! stable across template nesting: descending to a child appends the
//! child's local id, crossing into a nested instance's template content
//! appends an entered-template marker. Two nodes share an address iff they
//! occupy the same structural position; within one resolved tree full
//! addresses are unique, even for two placements of the same template.
//!
//! Addresses inside a cached template tree are relative to the template
//! root (the root is the empty address); override targets are authored in
//! that relative space.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::TemplateId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressSegment {
    /// Descend to this child within the current template scope.
    Child { local_id: String },

    /// Crossed into a nested instance's template content.
    Template { template_id: TemplateId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub segments: Vec<AddressSegment>,
}

impl NodeAddress {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn new(segments: Vec<AddressSegment>) -> Self {
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Child address within the current template scope.
    pub fn child(&self, local_id: impl Into<String>) -> NodeAddress {
        self.append(AddressSegment::Child {
            local_id: local_id.into(),
        })
    }

    /// Address just inside a nested instance's template content.
    pub fn entered(&self, template_id: impl Into<TemplateId>) -> NodeAddress {
        self.append(AddressSegment::Template {
            template_id: template_id.into(),
        })
    }

    pub fn append(&self, segment: AddressSegment) -> NodeAddress {
        let mut segments = self.segments.clone();
        segments.push(segment);
        NodeAddress { segments }
    }

    /// Concatenate a relative address onto this one.
    pub fn join(&self, relative: &NodeAddress) -> NodeAddress {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        NodeAddress { segments }
    }

    pub fn parent(&self) -> Option<NodeAddress> {
        if self.segments.is_empty() {
            None
        } else {
            Some(NodeAddress {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// The address relative to `prefix`, or None when this address does
    /// not sit under it. Stripping an address by itself yields the root.
    pub fn strip_prefix(&self, prefix: &NodeAddress) -> Option<NodeAddress> {
        if self.segments.len() < prefix.segments.len() {
            return None;
        }
        if self.segments[..prefix.segments.len()] != prefix.segments[..] {
            return None;
        }
        Some(NodeAddress {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        })
    }

    pub fn is_descendant_of(&self, potential_ancestor: &NodeAddress) -> bool {
        self.segments.len() > potential_ancestor.segments.len()
            && self.segments[..potential_ancestor.segments.len()] == potential_ancestor.segments[..]
    }

    /// Canonical map key. Equal iff the addresses are element-wise equal:
    /// ids are escaped so the encoding stays injective for arbitrary ids.
    pub fn to_key(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                AddressSegment::Child { local_id } => escape(local_id),
                AddressSegment::Template { template_id } => format!("@{}", escape(template_id)),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '@' => out.push_str("%40"),
            _ => out.push(ch),
        }
    }
    out
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
