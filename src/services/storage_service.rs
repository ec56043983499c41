use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{Client as S3Client, primitives::ByteStream};

use crate::error::{AppError, Result};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` and returns its public URL.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String>;
}

pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

pub struct S3Store {
    client: S3Client,
    bucket: String,
    region: String,
    timeout: Duration,
}

impl S3Store {
    pub fn new(client: S3Client, bucket: &str, region: &str, timeout: Duration) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            region: region.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        let upload = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send();

        tokio::time::timeout(self.timeout, upload)
            .await
            .map_err(|_| AppError::InternalError(format!("Upload of {} timed out", key)))?
            .map_err(|e| {
                tracing::error!("S3 upload of {} failed: {:?}", key, e);
                AppError::InternalError(format!("Upload of {} failed", key))
            })?;

        Ok(object_url(&self.bucket, &self.region, key))
    }
}
