use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An inclusive byte range `start..=end` within a blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Fails unless the range lies entirely inside an object of `size` bytes.
    pub fn check_within(&self, size: u64) -> Result<(), StorageError> {
        if self.start > self.end || self.end >= size {
            return Err(StorageError::InvalidRange {
                start: self.start,
                end: self.end,
                size,
            });
        }
        Ok(())
    }
}

/// Key-addressed blob storage.
///
/// Keys are slash-separated relative paths such as `owner/log/object.ext`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data));
        self.put_stream(key, reader).await.map(|_| ())
    }

    /// Store everything `reader` yields at `key`, replacing any existing
    /// object. Returns the number of bytes stored.
    async fn put_stream(&self, key: &str, reader: BoxReader) -> Result<u64, StorageError>;

    /// Open a reader over the object at `key`.
    ///
    /// With a range, the reader yields exactly `range.len()` bytes starting at
    /// `range.start`.
    async fn get_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<BoxReader, StorageError>;

    /// Read an object (or a range of it) fully into memory.
    async fn get(&self, key: &str, range: Option<ByteRange>) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key, range).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Delete every listed key. Keys that do not exist are skipped.
    async fn delete_many(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Get the size of an object in bytes.
    async fn size(&self, key: &str) -> Result<u64, StorageError>;
}

/// Reject keys that are empty or could escape the store's namespace.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!("absolute key: {key}")));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "forbidden character in key: {key}"
        )));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StorageError::InvalidKey(format!(
            "empty or relative segment in key: {key}"
        )));
    }
    Ok(())
}
