//! HTTP Basic authentication and principal loading.
//!
//! The credential's username selects a permission record; the record's
//! `cat`/`diss` lists become the request's [`Principal`]. Password
//! verification is a deployment hook left permissive here — identity alone
//! selects clearances, and a subject without a record gets the empty
//! principal (which dominates nothing) rather than an error.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use palisade_core::Principal;

use crate::store::DocumentStore;
use crate::{Error, Result};

/// Decode a `Basic` credential into `(username, password)`.
///
/// Returns `None` for a missing header, a non-Basic scheme, or garbled
/// base64/UTF-8.
#[must_use]
pub fn decode_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authenticate the request and load the subject's principal.
///
/// # Errors
///
/// [`Error::PermissionDenied`] when no usable Basic credential is present.
/// A failed permission lookup degrades to the empty principal — the
/// request proceeds and redaction/admission deny everything downstream.
pub async fn authenticate(store: &dyn DocumentStore, headers: &HeaderMap) -> Result<Principal> {
    let Some((username, _password)) = decode_basic(headers) else {
        return Err(Error::PermissionDenied);
    };

    let principal = match store.permissions(&username).await {
        Ok(Some(record)) => Principal::new(record.cat, record.diss),
        Ok(None) => {
            tracing::info!(%username, "no permission record for subject");
            Principal::default()
        }
        Err(err) => {
            tracing::warn!(%username, error = %err, "permission lookup failed");
            Principal::default()
        }
    };

    tracing::debug!(%username, "security context established");
    Ok(principal)
}
