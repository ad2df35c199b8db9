use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;

use super::{ObjectStore, StorageError};

/// S3 / MinIO bucket whose objects are served from `public_base_url`.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 upload failed: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, path);
        Ok(self.public_url(path))
    }
}
