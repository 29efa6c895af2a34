//! Security labels, principals, and the dominance relation between them.
//!
//! A label is a single classification category plus a set of dissemination
//! tokens. A principal carries the categories and dissemination tokens it is
//! cleared for. A labelled node is visible to a principal iff the node's
//! category is among the principal's categories and the node's dissemination
//! set is a subset of the principal's.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the sibling field that carries a node's [`Label`] in stored
/// documents, request bodies, and schema definitions.
pub const SEC_FIELD: &str = "_sec";

/// A two-part security label attached to a document or sub-object.
///
/// Stored on the wire as `{"cat": "...", "diss": ["...", ...]}`. Both parts
/// are optional in stored data; a missing category reads as the empty string
/// and a missing dissemination list as the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Single classification category, e.g. `usg_secret`.
    #[serde(default)]
    pub cat: String,

    /// Unordered dissemination tokens, e.g. `usg_noforn`.
    #[serde(default)]
    pub diss: BTreeSet<String>,
}

/// The authenticated subject's clearances for one request.
///
/// A subject may hold several categories at once (`unclassified`,
/// `confidential`, and `secret` simultaneously, say); categories do not
/// imply one another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// Categories the subject may read.
    pub cats: BTreeSet<String>,

    /// Dissemination tokens the subject is cleared for.
    pub diss: BTreeSet<String>,
}

impl Principal {
    /// Build a principal from any iterable of category and dissemination
    /// tokens.
    pub fn new<C, D>(cats: C, diss: D) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            cats: cats.into_iter().map(Into::into).collect(),
            diss: diss.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `label` is dominated by this principal (`L ⊑ P`).
    ///
    /// Both conjuncts must hold: the label's category is among the
    /// principal's categories, and the label's dissemination set is a
    /// subset of the principal's. An empty dissemination set is trivially a
    /// subset. An empty stored category encodes as the empty set on the
    /// wire and therefore passes vacuously; documents are expected to carry
    /// a real category by invariant.
    #[must_use]
    pub fn dominates(&self, label: &Label) -> bool {
        let cat_ok = label.cat.is_empty() || self.cats.contains(&label.cat);
        cat_ok && label.diss.is_subset(&self.diss)
    }
}

/// A `_sec` entry in a request body did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LabelError {
    /// The `_sec` value is not an object.
    #[error("label at `{path}` is not an object")]
    NotAnObject {
        /// Labelled path the entry was found at (`""` for the root).
        path: String,
    },

    /// The `cat` entry is present but not a string.
    #[error("label at `{path}` has a non-string category")]
    BadCategory {
        /// Labelled path the entry was found at.
        path: String,
    },

    /// The `diss` entry is present but not an array of strings.
    #[error("label at `{path}` has a malformed dissemination list")]
    BadDissemination {
        /// Labelled path the entry was found at.
        path: String,
    },
}

/// Collect every category and dissemination token referenced by a write
/// body.
///
/// Visits the body's root label plus the label of each labelled sub-object
/// actually present (`labelled_paths` comes from the resource's schema).
/// Absent labels contribute nothing. The result gates writes: a principal
/// may write the body only if every returned token appears among its own
/// categories or dissemination tokens.
///
/// # Errors
///
/// Returns [`LabelError`] when a present `_sec` entry is not shaped like a
/// label. Callers surface this as a malformed-body failure; no partial set
/// is returned.
pub fn collect_required(
    body: &Value,
    labelled_paths: &[String],
) -> Result<BTreeSet<String>, LabelError> {
    let mut required = BTreeSet::new();
    for path in labelled_paths {
        let Some(node) = lookup_path(body, path) else {
            continue;
        };
        let Some(sec) = node.get(SEC_FIELD) else {
            continue;
        };
        collect_label(sec, path, &mut required)?;
    }
    Ok(required)
}

/// Resolve a dot-separated path inside a JSON tree. The empty path is the
/// tree itself; a missing segment resolves to `None`.
#[must_use]
pub fn lookup_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(body);
    }
    path.split('.').try_fold(body, |node, segment| node.get(segment))
}

fn collect_label(
    sec: &Value,
    path: &str,
    out: &mut BTreeSet<String>,
) -> Result<(), LabelError> {
    let Some(map) = sec.as_object() else {
        return Err(LabelError::NotAnObject {
            path: path.to_string(),
        });
    };

    if let Some(cat) = map.get("cat") {
        let token = cat.as_str().ok_or_else(|| LabelError::BadCategory {
            path: path.to_string(),
        })?;
        out.insert(token.to_string());
    }

    if let Some(diss) = map.get("diss") {
        let list = diss.as_array().ok_or_else(|| LabelError::BadDissemination {
            path: path.to_string(),
        })?;
        for entry in list {
            let token = entry.as_str().ok_or_else(|| LabelError::BadDissemination {
                path: path.to_string(),
            })?;
            out.insert(token.to_string());
        }
    }

    Ok(())
}
