//! S3 object reader implementation

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;

/// Shared S3 client
///
/// Creating an S3 client is relatively expensive, so this struct allows
/// reusing the client across multiple operations.
#[derive(Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from AWS config
    pub async fn new() -> Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Ok(Self { client })
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Open an S3 object for streaming reads
    ///
    /// The returned reader blocks on the tokio runtime it was created in,
    /// so it must be consumed from a blocking thread (`spawn_blocking`),
    /// never from an async task.
    pub async fn open(
        &self,
        bucket: &str,
        key: &str,
        buffer_size: usize,
    ) -> Result<Box<dyn std::io::Read + Send>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch object from S3: s3://{bucket}/{key}"))?;

        tracing::debug!(
            "Opened S3 object s3://{}/{} ({} bytes)",
            bucket,
            key,
            response.content_length.unwrap_or_default()
        );

        // Convert byte stream to async read
        let stream = response.body.into_async_read();

        // Wrap in buffered reader
        let buffered = tokio::io::BufReader::with_capacity(buffer_size, stream);

        // Bridge async to sync
        let reader = tokio_util::io::SyncIoBridge::new(buffered);

        Ok(Box::new(reader))
    }
}

/// Reads S3 objects as streams
pub struct S3FileReader;

impl S3FileReader {
    /// Open an S3 object with a client built from the ambient AWS config
    pub async fn open(
        bucket: String,
        key: String,
        buffer_size: usize,
    ) -> Result<Box<dyn std::io::Read + Send>> {
        let client = S3Client::new().await?;
        client.open(&bucket, &key, buffer_size).await
    }
}
