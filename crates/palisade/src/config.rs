//! Gateway configuration loaded from YAML.
//!
//! # File format
//!
//! ```yaml
//! # palisade.yaml
//! database_host: mongodb://db.internal:27017
//! database_name: gateway
//! database_auth:
//!   username: palisade
//!   password: hunter2
//!   source: admin
//!
//! blob_store_credentials:
//!   access_key: AKIA...
//!   secret_key: ...
//! blob_bucket: attachments
//! attachment_mode: enabled   # enabled | disabled
//!
//! schema_source: schemas.json
//! listen: 0.0.0.0:8000
//! ```
//!
//! Every field has a default; an empty file is a valid local configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::load`]; the schema catalog
/// named by `schema_source` is also read once and is immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Document database connection string.
    pub database_host: String,

    /// Database holding the resource collections and permission records.
    pub database_name: String,

    /// Optional database credentials; empty username disables them.
    pub database_auth: DatabaseAuth,

    /// Blob store credentials; empty access key falls back to the
    /// environment's default credential chain.
    pub blob_store_credentials: BlobCredentials,

    /// Bucket holding attachment blobs.
    pub blob_bucket: String,

    /// Whether the attachment side-channel is active.
    pub attachment_mode: AttachmentMode,

    /// Path to the JSON schema catalog (`{resource: schema}`).
    pub schema_source: PathBuf,

    /// Listen address, overridable with `--listen`.
    pub listen: String,
}

/// Database credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseAuth {
    /// Username; empty means unauthenticated.
    pub username: String,
    /// Password.
    pub password: String,
    /// Authentication source database.
    pub source: String,
}

/// Blob store credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlobCredentials {
    /// Access key id; empty means use the ambient credential chain.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
}

/// Whether the attachment side-channel runs or passes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentMode {
    /// Mint upload URLs on writes and substitute blob contents on reads.
    Enabled,
    /// Leave request and response bodies untouched.
    #[default]
    Disabled,
}

impl AttachmentMode {
    /// Whether the side-channel is active.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_host: "mongodb://127.0.0.1:27017".to_string(),
            database_name: "gateway".to_string(),
            database_auth: DatabaseAuth::default(),
            blob_store_credentials: BlobCredentials::default(),
            blob_bucket: "attachments".to_string(),
            attachment_mode: AttachmentMode::default(),
            schema_source: PathBuf::from("schemas.json"),
            listen: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for DatabaseAuth {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            source: "admin".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }
}
