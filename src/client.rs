//! Defines the storage capability, its S3 implementation, and the
//! global S3 client.

use crate::error::{BoxError, StorageError, ThumbnailError};
use crate::trigger::content_type;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::from_env;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures_util::StreamExt;
use once_cell::sync::OnceCell;
use std::env;
use std::pin::Pin;
use tracing::{debug, instrument};

/// A response body delivered in chunks.
#[async_trait]
pub trait ObjectBody: Send {
    /// The next chunk of the body, or `None` once it's exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StorageError>;
}

/// The object storage operations the pipeline needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    type Body: ObjectBody;

    async fn get(&self, bucket: &str, key: &str) -> Result<Self::Body, StorageError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// An S3 response body, read chunk by chunk.
pub struct S3Body(Pin<Box<ByteStream>>);

impl From<ByteStream> for S3Body {
    fn from(stream: ByteStream) -> Self {
        S3Body(Box::pin(stream))
    }
}

#[async_trait]
impl ObjectBody for S3Body {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StorageError> {
        self.0
            .next()
            .await
            .transpose()
            .map_err(|e| StorageError::Transport(e.into()))
    }
}

/// Sort an S3 service error into the storage failure kinds, given its
/// error code.
fn classify(code: Option<&str>, not_found: bool, error: BoxError) -> StorageError {
    match code {
        _ if not_found => StorageError::NotFound(error),
        Some("NoSuchKey") | Some("NotFound") => StorageError::NotFound(error),
        Some("AccessDenied") => StorageError::AccessDenied(error),
        _ => StorageError::Transport(error),
    }
}

#[async_trait]
impl ObjectStore for Client {
    type Body = S3Body;

    async fn get(&self, bucket: &str, key: &str) -> Result<S3Body, StorageError> {
        let output = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let error = e.into_service_error();
                let code = error.code().map(String::from);
                classify(code.as_deref(), error.is_no_such_key(), error.into())
            })?;
        Ok(S3Body::from(output.body))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let error = e.into_service_error();
                let code = error.code().map(String::from);
                classify(code.as_deref(), false, error.into())
            })?;
        Ok(())
    }
}

/// Downloads a single object from storage into memory. Chunks are
/// appended in the order they arrive.
#[instrument(skip(store))]
pub async fn download<S: ObjectStore>(
    store: &S,
    bucket: &str,
    key: &str,
) -> Result<Vec<u8>, ThumbnailError> {
    let fetch_failed = |source| ThumbnailError::FetchFailed {
        bucket: String::from(bucket),
        key: String::from(key),
        source,
    };
    let mut body = store.get(bucket, key).await.map_err(fetch_failed)?;
    let mut buffer = Vec::new();
    let mut chunks = 0usize;
    while let Some(chunk) = body.next_chunk().await.map_err(fetch_failed)? {
        buffer.extend_from_slice(&chunk);
        chunks += 1;
    }
    debug!(chunks, size = buffer.len(), "Downloaded object");
    Ok(buffer)
}

/// Uploads a single object to storage, replacing whatever is stored
/// under `key`.
#[instrument(skip(store, body), fields(size = body.len()))]
pub async fn upload<S: ObjectStore>(
    store: &S,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    encoding_format: &str,
) -> Result<(), ThumbnailError> {
    store
        .put(bucket, key, body, &content_type(encoding_format))
        .await
        .map_err(|source| ThumbnailError::WriteFailed {
            bucket: String::from(bucket),
            key: String::from(key),
            source,
        })
}

/// Global S3 client instance.
static CURRENT: OnceCell<Client> = OnceCell::new();

/// Initialize the global S3 client.
pub async fn init() -> Result<()> {
    let endpoint_url_var = env::var("AWS_ENDPOINT_URL");
    let s3_config = if let Ok(endpoint_url) = endpoint_url_var {
        from_env()
            .endpoint_url(
                if endpoint_url.starts_with("http://") || endpoint_url.starts_with("https://") {
                    endpoint_url
                } else {
                    format!("https://{}", endpoint_url)
                },
            )
            .region("us-east-1") // should be OK since the endpoint was overridden
            .load()
    } else {
        from_env().load()
    }
    .await;
    let client = Client::new(&s3_config);
    CURRENT
        .set(client)
        .map_err(|_| anyhow!("client::CURRENT was already initialized"))
}

/// Get the current S3 client instance, or panic if it hasn't been initialized.
pub fn current() -> &'static Client {
    CURRENT.get().expect("client is not initialized")
}
