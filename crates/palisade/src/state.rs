//! Shared gateway state.

use std::sync::Arc;

use palisade_core::SchemaRegistry;

use crate::config::AttachmentMode;
use crate::store::{BlobStore, DocumentStore};

/// Read-only state shared by every request handler.
///
/// The registry is immutable after startup; store handles are pooled by the
/// drivers behind the trait objects. Nothing request-scoped lives here —
/// per-request state is the [`RequestContext`](crate::RequestContext).
pub struct GatewayState {
    /// Resource schemas and their labelled paths.
    pub registry: SchemaRegistry,

    /// The document database.
    pub store: Arc<dyn DocumentStore>,

    /// The blob service behind the attachment side-channel.
    pub blobs: Arc<dyn BlobStore>,

    /// Whether the attachment side-channel is active.
    pub attachment_mode: AttachmentMode,
}

impl GatewayState {
    /// Assemble gateway state from its parts.
    #[must_use]
    pub fn new(
        registry: SchemaRegistry,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        attachment_mode: AttachmentMode,
    ) -> Self {
        Self {
            registry,
            store,
            blobs,
            attachment_mode,
        }
    }
}
