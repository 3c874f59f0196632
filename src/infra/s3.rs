use crate::app::ports::BlobStore;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;

pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment. `AWS_ENDPOINT_URL` enables
    /// S3-compatible endpoints with path-style addressing.
    pub async fn from_env() -> Self {
        let region_provider = RegionProviderChain::default_provider().or_else("ap-southeast-1");
        let shared = aws_config::from_env().region(region_provider).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ScraperError::Storage {
                message: format!("put s3://{}/{} failed: {}", bucket, key, e),
            })?;
        info!(bucket, key, size, "Uploaded blob to S3");
        Ok(())
    }
}
