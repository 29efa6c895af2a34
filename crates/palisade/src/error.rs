//! Gateway error type — one enum for every user-visible failure, with its
//! HTTP mapping.
//!
//! The rewriter and the label algebra are total and never appear here; all
//! failures originate in the write-path gates, request parsing, or the
//! downstream stores. Responses use a fixed JSON envelope:
//!
//! ```json
//! { "error": { "code": 403, "message": "...", "status": "PERMISSION_DENIED" } }
//! ```

use axum::extract::Json;
use axum::response::IntoResponse;
use http::StatusCode;
use palisade_core::LabelError;

use crate::store::StoreError;

/// Errors produced by the gateway.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An admission gate rejected the request. Never retried, never
    /// accompanied by a partial effect.
    #[error("permission denied")]
    PermissionDenied,

    /// The request body (or aggregate query) is not a parseable document
    /// tree. No mutation occurs.
    #[error("malformed request body: {0}")]
    BodyMalformed(String),

    /// A `_sec` entry in the request body did not have the label shape.
    #[error(transparent)]
    Label(#[from] LabelError),

    /// The document or blob store failed; surfaced unchanged and logged
    /// once.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading a configuration or schema file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Parsing the configuration file failed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml_ng::Error),
}

/// Convenience alias used throughout the gateway's public API.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn http_status(&self) -> StatusCode {
        match self {
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::BodyMalformed(_)
            | Self::Label(_)
            | Self::Store(_)
            | Self::Io(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn status_name(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::BodyMalformed(_) | Self::Label(_) => "MALFORMED_BODY",
            Self::Store(_) => "STORE_ERROR",
            Self::Io(_) | Self::Config(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Self::Store(err) = &self {
            tracing::error!(error = %err, "store failure surfaced to client");
        }

        let status = self.http_status();
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "status": self.status_name(),
            }
        });

        (status, Json(body)).into_response()
    }
}
