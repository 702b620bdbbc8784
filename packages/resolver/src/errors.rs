//! Error types for the resolver.
//!
//! Content-level problems never abort a resolve: they accumulate as
//! [`ResolveWarning`]s beside the successful result, so one broken
//! reference cannot take down a whole document. [`StoreError`] is the
//! typed error channel for template store implementations only.

use serde::Serialize;
use thiserror::Error;

use stencil_document::TemplateId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed template document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Recoverable conditions encountered while resolving or collapsing.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ResolveWarning {
    #[error("template not found: {template_id}")]
    TemplateNotFound { template_id: TemplateId },

    #[error("template unreadable: {template_id}: {detail}")]
    TemplateUnreadable {
        template_id: TemplateId,
        detail: String,
    },

    #[error("circular template reference: {template_id}")]
    CircularTemplateReference { template_id: TemplateId },

    #[error("override target missing in template {template_id}: {target}")]
    OverrideTargetMissing {
        template_id: TemplateId,
        target: String,
    },

    #[error("invalid override patch at {target}: {detail}")]
    InvalidOverridePatch { target: String, detail: String },
}

/// Why a template could not be served from the cache. The caller recovers
/// with a fallback node and the matching warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFault {
    NotFound,
    Circular,
}
