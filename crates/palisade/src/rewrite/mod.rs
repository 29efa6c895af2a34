//! The aggregation-plan rewriter.
//!
//! Given the labelled paths of a resource and the requesting principal,
//! [`apply_redaction`] turns a base aggregation plan into one whose
//! server-side execution returns each candidate document with every
//! labelled sub-tree the principal does not dominate pruned, and with all
//! rewriter-added metadata stripped. The transformation appends, in order:
//!
//! 1. widening of unbound `_id` match constraints,
//! 2. a pair of `$addFields` verdict stages per labelled path (root first),
//! 3. two `$redact` stages pruning on `cat_matches` then `diss_matches`,
//! 4. one `$project` stage excluding every verdict field.
//!
//! Because `$redact` re-evaluates at each level of descent and any failure
//! prunes, the result is a logical AND across category and dissemination
//! and across every labelled ancestor; pruning is closed under descent.
//!
//! The write path reuses step 2 alone via [`probe_pipeline`] to ask the
//! store which stored labels the principal dominates before admitting a
//! mutation.
//!
//! Everything here is a pure function over `serde_json::Value` stages: no
//! I/O, no framework state, and no runtime failure. Plans already rewritten
//! must not be rewritten again.

mod stages;

use palisade_core::Principal;
use serde_json::Value;

pub(crate) use stages::MATCH_FALSE;

/// Verdict field recording category matches. Reserved: never present in
/// stored documents, never present in responses.
pub const CAT_MATCHES: &str = "cat_matches";

/// Verdict field recording dissemination matches. Reserved like
/// [`CAT_MATCHES`].
pub const DISS_MATCHES: &str = "diss_matches";

/// Rewrite `pipeline` in place so its execution redacts everything the
/// principal does not dominate.
///
/// `labelled_paths` comes from the schema registry and always starts with
/// the root path; passing the degenerate `[""]` list yields a plan that
/// enforces only the document-root label.
pub fn apply_redaction(pipeline: &mut Vec<Value>, labelled_paths: &[String], principal: &Principal) {
    stages::widen_unbound_id_match(pipeline);

    for path in labelled_paths {
        pipeline.extend(stages::annotate_path(path, principal));
    }

    pipeline.push(stages::prune_unmatched(&format!("${CAT_MATCHES}")));
    pipeline.push(stages::prune_unmatched(&format!("${DISS_MATCHES}")));
    pipeline.push(stages::strip_annotations(labelled_paths));

    tracing::debug!(stages = pipeline.len(), "rewrote aggregation plan");
}

/// Build the write-admission probe: match one document by id, then
/// annotate the given paths with verdict fields.
///
/// The probe carries no prune or projection stages — the caller inspects
/// the verdict arrays in the result directly, so a failed match is
/// observable rather than silently dropping the document.
#[must_use]
pub fn probe_pipeline(id: &str, paths: &[String], principal: &Principal) -> Vec<Value> {
    let mut pipeline = vec![stages::id_match(&Value::String(id.to_string()))];
    for path in paths {
        pipeline.extend(stages::annotate_path(path, principal));
    }
    pipeline
}
