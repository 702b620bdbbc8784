//! # Stencil Document Model
//!
//! Persisted data model for Stencil prefab documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: persisted model                   │
//! │  - DocumentNode tree (closed union)         │
//! │  - NodeAddress + canonical codec            │
//! │  - Override sets (minimal patches)          │
//! │  - Local id assignment                      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ resolver: raw tree → resolved tree          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ runtime: materialized stage + collapse      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The model is plain serde data: cloneable value trees with no parent
//! back-references, so resolved and runtime views stay cheap to clone,
//! diff and serialize deterministically.

pub mod address;
pub mod local_id;
pub mod node;
pub mod overrides;
pub mod registry;
pub mod visitor;

pub use address::{AddressSegment, NodeAddress};
pub use local_id::{document_seed, LocalIdAssigner};
pub use node::{
    ComponentRecord, DocumentNode, FrameNode, ImageFit, ImageNode, InstanceNode, NodeBase,
    PrefabRef, RawDocument, ShapeKind, ShapeNode, TemplateId, TextAlign, TextNode, Vec2,
    PLACEMENT_KEYS,
};
pub use overrides::{ComponentOverride, ObjectOverride, OverrideSet};
pub use registry::{ComponentRegistry, CoreComponents};
pub use visitor::{walk_node, walk_node_mut, Visitor, VisitorMut};
