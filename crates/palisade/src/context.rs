//! Per-request context.
//!
//! The original data layer kept the principal and collected write tokens in
//! process-wide request globals; here the context is an explicit value owned
//! by the request task, created at admission and dropped at response
//! emission. It never crosses requests.

use std::collections::BTreeSet;

use palisade_core::Principal;

/// State carried through one request's middleware chain.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The authenticated subject's clearances.
    pub principal: Principal,

    /// Tokens the write body requires, collected by the first write gate
    /// and checked by the second.
    pub collected_required: BTreeSet<String>,

    /// Presigned upload URLs minted by the attachment side-channel, echoed
    /// in the response envelope.
    pub attachment_urls: Vec<String>,
}

impl RequestContext {
    /// Create a context for an authenticated principal.
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }
}
