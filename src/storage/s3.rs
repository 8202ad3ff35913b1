//! AWS S3 archive.
//!
//! The payload fingerprint is stored as object metadata on the latest
//! snapshot, so change detection is a single `HeadObject`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::ArchiveBackend;

/// Metadata key holding the payload fingerprint.
const FINGERPRINT_KEY: &str = "fingerprint";

/// S3-based snapshot archive.
#[derive(Debug, Clone)]
pub struct S3Archive {
    client: Client,
    bucket: String,
}

impl S3Archive {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the default credential chain, with an optional
    /// region override.
    pub async fn from_config(bucket: &str, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        Self::new(Client::new(&config), bucket)
    }
}

#[async_trait]
impl ArchiveBackend for S3Archive {
    async fn latest_fingerprint(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let stored = output
                    .metadata()
                    .and_then(|m| m.get(FINGERPRINT_KEY))
                    .cloned();
                if stored.is_none() {
                    log::warn!(
                        "s3://{}/{} has no fingerprint metadata; treating as changed",
                        self.bucket,
                        key
                    );
                }
                Ok(stored)
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    log::info!("No existing snapshot at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::archive(key, DisplayErrorContext(&service_err)))
                }
            }
        }
    }

    async fn write_latest(&self, key: &str, payload: &[u8], fingerprint: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(payload.to_vec()))
            .content_type("application/json")
            .metadata(FINGERPRINT_KEY, fingerprint)
            .send()
            .await
            .map_err(|e| AppError::archive(key, DisplayErrorContext(&e)))?;

        log::info!("Wrote {} bytes to s3://{}/{}", payload.len(), self.bucket, key);
        Ok(())
    }

    async fn copy_to_history(&self, from: &str, to: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, from))
            .key(to)
            .send()
            .await
            .map_err(|e| AppError::archive(to, DisplayErrorContext(&e)))?;

        log::info!("Copied s3://{}/{} to {}", self.bucket, from, to);
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
