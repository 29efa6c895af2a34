//! S3 adapter for [`BlobStore`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

use super::{BlobStore, StoreError};
use crate::config::GatewayConfig;

/// Lifetime of minted upload URLs.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// The production blob store, backed by the S3 SDK's pooled client.
pub struct S3Blobs {
    client: Client,
    bucket: String,
}

impl S3Blobs {
    /// Build a client from the gateway configuration.
    ///
    /// An empty access key falls back to the environment's default
    /// credential chain.
    pub async fn connect(config: &GatewayConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        let credentials = &config.blob_store_credentials;
        if !credentials.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key.clone(),
                credentials.secret_key.clone(),
                None,
                None,
                "palisade-config",
            ));
        }
        let shared = loader.load().await;

        Self {
            client: Client::new(&shared),
            bucket: config.blob_bucket.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3Blobs {
    async fn presign_put(&self, key: &str) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(blob_error)?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(blob_error)?;
        Ok(request.uri().to_string())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(blob_error)?;
        let data = object.body.collect().await.map_err(blob_error)?;
        Ok(data.into_bytes().to_vec())
    }
}

fn blob_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Blob(err.to_string())
}
