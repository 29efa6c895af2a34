//! Narrow interfaces to the gateway's external collaborators.
//!
//! The engine consumes the document database and the blob service through
//! the two traits here; driver error types are flattened to strings at the
//! adapter boundary so nothing above this module names a driver.

mod mongo;
mod s3;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use mongo::MongoStore;
pub use s3::S3Blobs;

/// A document store or blob service call failed.
///
/// Surfaced unchanged to the caller (the gateway never retries or hides
/// store failures) and logged once at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The document database rejected or failed an operation.
    #[error("document store error: {0}")]
    Database(String),

    /// The blob service rejected or failed an operation.
    #[error("blob store error: {0}")]
    Blob(String),
}

/// A stored permission record selecting a subject's clearances.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionRecord {
    /// Subject identity, as presented in the Basic credential.
    pub username: String,

    /// Categories the subject may read.
    #[serde(default)]
    pub cat: Vec<String>,

    /// Dissemination tokens the subject is cleared for.
    #[serde(default)]
    pub diss: Vec<String>,
}

/// The document database, reduced to what the gateway needs.
///
/// Aggregation plans are executed server-side exactly as given — the
/// rewriter's output is the enforcement mechanism, so the adapter must not
/// reorder or drop stages.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run an aggregation pipeline against a resource collection.
    async fn aggregate(
        &self,
        resource: &str,
        pipeline: Vec<Value>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert a document, returning its new id.
    async fn insert(&self, resource: &str, document: Value) -> Result<String, StoreError>;

    /// Apply a set of top-level field changes to one document.
    async fn update(&self, resource: &str, id: &str, changes: &Value) -> Result<(), StoreError>;

    /// Remove one document.
    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError>;

    /// Look up a subject's permission record, if any.
    async fn permissions(&self, username: &str)
        -> Result<Option<PermissionRecord>, StoreError>;
}

/// The blob service behind the attachment side-channel.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Mint a presigned upload URL bound to `key`.
    async fn presign_put(&self, key: &str) -> Result<String, StoreError>;

    /// Fetch the contents stored under `key`.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}
