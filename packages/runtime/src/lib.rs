//! # Stencil Runtime
//!
//! Runtime side of the prefab pipeline: materializes resolved trees onto
//! a stage, stamps instance metadata, and collapses edited subtrees back
//! into persistable documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ resolver: raw document → ResolvedNode tree  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ runtime: Engine facade                      │
//! │  - RuntimeStage (arena, 1:1 with resolved)  │
//! │  - bind_meta: {instance_root, address}      │
//! │  - collapse: instance ref + fresh diff      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **Documents are the source of truth**: the stage is a derived view,
//!    rebuilt by expansion at any time.
//! 2. **Template content is read-only at runtime**: only an instance's
//!    own root may be edited directly; content strictly inside changes
//!    through override patches. The stage queries exist so the editing
//!    layer can enforce this.
//! 3. **Runtime ids are ephemeral**: never persisted, rebound after every
//!    materialization.

pub mod binder;
pub mod engine;
pub mod serializer;
pub mod stage;

pub use binder::bind_meta;
pub use engine::{Engine, Expanded};
pub use serializer::collapse;
pub use stage::{RuntimeMeta, RuntimeNode, RuntimeNodeId, RuntimeStage};

// Re-export the crates a host embeds alongside this one.
pub use stencil_document as document;
pub use stencil_resolver as resolver;
