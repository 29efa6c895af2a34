//! The write path: three admission gates run in order before any mutation.
//!
//! 1. [`collect_body_labels`] — gather every token the request body's
//!    labels reference (create, patch).
//! 2. [`admit_body_labels`] — the writer must hold every collected token
//!    (create, patch).
//! 3. [`admit_stored`] — probe the stored document to confirm the writer
//!    dominates the labels of everything it intends to modify (patch,
//!    delete).
//!
//! Admission is atomic: any gate failing rejects the whole request before a
//! single mutation is issued. The gates take the request context
//! positionally; nothing here touches framework state.

use palisade_core::{collect_required, lookup_path, Principal, SchemaRegistry};
use serde_json::Value;

use crate::context::RequestContext;
use crate::rewrite::{self, CAT_MATCHES, DISS_MATCHES, MATCH_FALSE};
use crate::store::DocumentStore;
use crate::{Error, Result};

/// Which mutation the stored-data gate is admitting.
#[derive(Debug, Clone, Copy)]
pub enum WriteOp<'a> {
    /// A patch; only labelled paths present in the update body are probed.
    Patch {
        /// The parsed update body.
        body: &'a Value,
    },
    /// A delete; every labelled path of the resource is probed.
    Delete,
}

/// Gate 1: parse the body's labels and stash the tokens they require on
/// the request context.
///
/// # Errors
///
/// [`Error::BodyMalformed`] when the body is not a document tree;
/// [`Error::Label`] when a present `_sec` entry is not label-shaped. Both
/// abort the request with no mutation.
pub fn collect_body_labels(
    ctx: &mut RequestContext,
    registry: &SchemaRegistry,
    resource: &str,
    body: &Value,
) -> Result<()> {
    if !body.is_object() {
        return Err(Error::BodyMalformed(
            "request body is not a document".to_string(),
        ));
    }

    ctx.collected_required = collect_required(body, registry.labelled_paths(resource))?;
    tracing::debug!(
        resource,
        required = ?ctx.collected_required,
        "collected write-body label tokens",
    );
    Ok(())
}

/// Gate 2: every collected token must be among the principal's categories
/// or dissemination tokens.
///
/// Categories and dissemination are unioned for this check: a writer must
/// be cleared both to carry the classification and to carry every
/// distribution marker it stamps.
///
/// # Errors
///
/// [`Error::PermissionDenied`] on the first missing token.
pub fn admit_body_labels(ctx: &RequestContext) -> Result<()> {
    for token in &ctx.collected_required {
        if !ctx.principal.cats.contains(token) && !ctx.principal.diss.contains(token) {
            tracing::info!(%token, "write body requires a token the writer lacks");
            return Err(Error::PermissionDenied);
        }
    }
    Ok(())
}

/// Gate 3: probe the stored document and require the principal to dominate
/// the labels of every field the operation touches.
///
/// The probe matches the target id and annotates the root plus the
/// operation's relevant labelled paths; no prune or projection stages, so
/// failed matches surface as `"false"` verdicts rather than a silently
/// missing document.
///
/// # Errors
///
/// [`Error::PermissionDenied`] when the probe returns nothing (the
/// document is absent or outside the principal's view) or when any
/// inspected verdict contains `"false"`; [`Error::Store`] when the probe
/// itself fails.
pub async fn admit_stored(
    store: &dyn DocumentStore,
    registry: &SchemaRegistry,
    principal: &Principal,
    resource: &str,
    id: &str,
    op: WriteOp<'_>,
) -> Result<()> {
    let labelled = registry.labelled_paths(resource);

    let mut paths = vec![String::new()];
    match op {
        WriteOp::Patch { body } => paths.extend(
            labelled
                .iter()
                .filter(|path| !path.is_empty() && lookup_path(body, path).is_some())
                .cloned(),
        ),
        WriteOp::Delete => paths.extend(labelled.iter().filter(|path| !path.is_empty()).cloned()),
    }

    let probe = rewrite::probe_pipeline(id, &paths, principal);
    let results = store.aggregate(resource, probe).await?;
    let Some(stored) = results.first() else {
        tracing::info!(resource, id, "stored-data probe matched no document");
        return Err(Error::PermissionDenied);
    };

    for path in &paths {
        let Some(node) = lookup_path(stored, path) else {
            continue;
        };
        // Scalar fields carry no verdicts; only labelled objects do.
        if !node.is_object() {
            continue;
        }
        if contains_false(node.get(CAT_MATCHES)) || contains_false(node.get(DISS_MATCHES)) {
            tracing::info!(resource, id, %path, "writer does not dominate stored label");
            return Err(Error::PermissionDenied);
        }
    }

    Ok(())
}

fn contains_false(verdicts: Option<&Value>) -> bool {
    verdicts
        .and_then(Value::as_array)
        .is_some_and(|array| array.iter().any(|verdict| verdict == MATCH_FALSE))
}
