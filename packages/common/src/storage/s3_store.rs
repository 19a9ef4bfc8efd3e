use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use s3::{Bucket, Region, creds::Credentials};
use serde::Deserialize;

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader, ByteRange, validate_key};

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Clone, Deserialize)]
pub struct S3StoreConfig {
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Retry count applied by the S3 client on transient failures.
    #[serde(default = "default_retries")]
    pub retries: u8,
}

fn default_retries() -> u8 {
    3
}

/// Blob store backed by an S3-compatible bucket (path-style addressing).
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    bucket: Box<Bucket>,
}

impl S3BlobStore {
    pub fn create(config: S3StoreConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid S3 credentials: {e}")))?;

        let bucket = Bucket::new(
            &config.bucket,
            Region::Custom {
                endpoint: config.endpoint,
                region: config.region,
            },
            credentials,
        )
        .map_err(backend)?
        .with_path_style();
        s3::set_retries(config.retries.into());

        Ok(Self { bucket })
    }
}

fn backend(err: s3::error::S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn check_status(key: &str, code: u16) -> Result<(), StorageError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        code => Err(StorageError::Backend(format!(
            "unexpected http status code {code} for {key}"
        ))),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;
        let res = self.bucket.put_object(key, &data).await.map_err(backend)?;
        check_status(key, res.status_code())
    }

    async fn put_stream(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_key(key)?;
        let res = self
            .bucket
            .put_object_stream(&mut reader, key)
            .await
            .map_err(backend)?;
        check_status(key, res.status_code())?;
        Ok(res.uploaded_bytes() as u64)
    }

    async fn get_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<BoxReader, StorageError> {
        validate_key(key)?;
        let size = self.size(key).await?;

        let mut bucket = *self.bucket.clone();
        if let Some(range) = range {
            range.check_within(size)?;
            bucket.add_header("Range", &format!("bytes={}-{}", range.start, range.end));
        }

        let stream = bucket.get_object_stream(key).await.map_err(backend)?;
        Ok(Box::new(stream))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StorageError> {
        let deletes = keys.iter().map(|key| async move {
            validate_key(key)?;
            let res = self.bucket.delete_object(key).await.map_err(backend)?;
            match check_status(key, res.status_code()) {
                Err(StorageError::NotFound(_)) => Ok(()),
                other => other,
            }
        });
        try_join_all(deletes).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.size(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn size(&self, key: &str) -> Result<u64, StorageError> {
        let (head, code) = self.bucket.head_object(key).await.map_err(backend)?;
        check_status(key, code)?;
        let len = head
            .content_length
            .ok_or_else(|| StorageError::Backend(format!("missing content-length for {key}")))?;
        u64::try_from(len)
            .map_err(|_| StorageError::Backend(format!("negative content-length for {key}")))
    }
}
