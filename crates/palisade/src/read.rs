//! The read path: one hook invoked before every aggregation.
//!
//! The hook rewrites the incoming plan and nothing else; the aggregation
//! executor then runs the rewritten plan as-is. The read path never
//! consults the store directly.

use palisade_core::{Principal, SchemaRegistry};
use serde_json::Value;

use crate::rewrite;

/// Rewrite `pipeline` in place so its execution redacts everything
/// `principal` is not cleared for.
///
/// Unknown resources degrade to root-only enforcement via the registry's
/// degenerate path list.
pub fn before_aggregation(
    registry: &SchemaRegistry,
    principal: &Principal,
    resource: &str,
    pipeline: &mut Vec<Value>,
) {
    tracing::debug!(resource, "applying redaction to read pipeline");
    rewrite::apply_redaction(pipeline, registry.labelled_paths(resource), principal);
}
