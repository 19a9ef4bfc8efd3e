use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader, ByteRange, validate_key};

/// In-process blob store keeping every object in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, Bytes>,
}

impl MemoryBlobStore {
    /// Creates a new, empty `MemoryBlobStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn put_stream(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_key(key)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        let size = buf.len() as u64;
        self.objects.insert(key.to_string(), Bytes::from(buf));
        Ok(size)
    }

    async fn get_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<BoxReader, StorageError> {
        let object = self
            .objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let slice = match range {
            Some(range) => {
                range.check_within(object.len() as u64)?;
                object.slice(range.start as usize..=range.end as usize)
            }
            None => object,
        };
        Ok(Box::new(Cursor::new(slice)))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.objects.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(key))
    }

    async fn size(&self, key: &str) -> Result<u64, StorageError> {
        self.objects
            .get(key)
            .map(|entry| entry.value().len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
