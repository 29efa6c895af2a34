//! Individual aggregation-stage builders.
//!
//! Match verdicts travel through the database as the string literals
//! `"true"` and `"false"` inside one-element arrays: the database is the
//! evaluator, and a subset test against `["false"]` works uniformly for
//! scalar and array-valued labels. That wire encoding is confined to this
//! module — everything above it speaks [`Principal`] and plain booleans.

use std::collections::BTreeSet;

use palisade_core::{Principal, SEC_FIELD};
use serde_json::{json, Map, Value};

use super::{CAT_MATCHES, DISS_MATCHES};

/// Wire encoding of a passed match.
pub(crate) const MATCH_TRUE: &str = "true";
/// Wire encoding of a failed match.
pub(crate) const MATCH_FALSE: &str = "false";

/// `$match` stage binding `_id` to a caller-supplied constraint.
pub(crate) fn id_match(id: &Value) -> Value {
    json!({"$match": {"_id": id}})
}

/// Replace unbound `_id` constraints with an existence predicate.
///
/// The upstream query binder leaves `"*"` (explicit wildcard) or `"$id"`
/// (unsubstituted placeholder) behind when the caller did not name a
/// document; either must select every document rather than none.
pub(crate) fn widen_unbound_id_match(pipeline: &mut [Value]) {
    for stage in pipeline {
        let Some(constraints) = stage.get_mut("$match").and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(id) = constraints.get_mut("_id") else {
            continue;
        };
        if matches!(id.as_str(), Some("*" | "$id")) {
            *id = json!({"$exists": "true"});
        }
    }
}

/// The two annotation stages for one labelled path.
///
/// `cat_matches` tests the stored scalar category against the principal's
/// categories; `diss_matches` tests the stored dissemination array against
/// the principal's dissemination tokens. The category reference is wrapped
/// twice (`[["$p._sec.cat"]]`) and the dissemination reference once
/// (`["$p._sec.diss"]`) so that in both cases `$map` iterates a one-element
/// array whose element is itself the array handed to `$setIsSubset`.
pub(crate) fn annotate_path(path: &str, principal: &Principal) -> [Value; 2] {
    let prefix = path_prefix(path);
    let cat_ref = format!("${prefix}{SEC_FIELD}.cat");
    let diss_ref = format!("${prefix}{SEC_FIELD}.diss");

    [
        add_match_field(
            &format!("{prefix}{CAT_MATCHES}"),
            json!([[cat_ref]]),
            &principal.cats,
        ),
        add_match_field(
            &format!("{prefix}{DISS_MATCHES}"),
            json!([diss_ref]),
            &principal.diss,
        ),
    ]
}

/// `$addFields` stage writing a one-element `["true"]`/`["false"]` verdict
/// array: `"true"` iff every token the stored label requires is among the
/// principal's cleared tokens. A missing label reads as the empty
/// requirement and passes.
fn add_match_field(verdict_field: &str, rule_input: Value, cleared: &BTreeSet<String>) -> Value {
    let cleared: Vec<&String> = cleared.iter().collect();

    let mut fields = Map::new();
    fields.insert(
        verdict_field.to_string(),
        json!({
            "$map": {
                "input": rule_input,
                "as": "rule",
                "in": {
                    "$cond": {
                        "if": {
                            "$setIsSubset": [{"$ifNull": ["$$rule", []]}, cleared]
                        },
                        "then": MATCH_TRUE,
                        "else": MATCH_FALSE,
                    }
                }
            }
        }),
    );

    json!({"$addFields": fields})
}

/// `$redact` stage pruning any sub-document whose verdict array at the
/// current level contains `"false"`.
///
/// `field_ref` is a `$`-prefixed reference (`"$cat_matches"`); `$redact`
/// re-resolves it at every level of descent, so one stage covers the root
/// and all nested labelled sub-objects. An absent verdict defaults to
/// `["true"]`: no label at this level means no decision here, descend.
pub(crate) fn prune_unmatched(field_ref: &str) -> Value {
    json!({
        "$redact": {
            "$cond": {
                "if": {
                    "$setIsSubset": [
                        [MATCH_FALSE],
                        {"$ifNull": [field_ref, [MATCH_TRUE]]}
                    ]
                },
                "then": "$$PRUNE",
                "else": "$$DESCEND",
            }
        }
    })
}

/// `$project` stage excluding every verdict field added by
/// [`annotate_path`] across all labelled paths.
pub(crate) fn strip_annotations(paths: &[String]) -> Value {
    let mut projection = Map::new();
    for path in paths {
        let prefix = path_prefix(path);
        projection.insert(format!("{prefix}{CAT_MATCHES}"), json!(0));
        projection.insert(format!("{prefix}{DISS_MATCHES}"), json!(0));
    }
    json!({"$project": projection})
}

/// Dotted prefix for a labelled path: empty for the root, `"p."` otherwise.
fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}.")
    }
}
