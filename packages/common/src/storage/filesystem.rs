use std::io::SeekFrom;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader, ByteRange, validate_key};

/// Filesystem-backed blob store.
///
/// An object with key `a/b/c.mp4` lives at `{base_path}/a/b/c.mp4`.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        if key.starts_with(".tmp/") || key == ".tmp" {
            return Err(StorageError::InvalidKey(format!("reserved key: {key}")));
        }
        Ok(self.base_path.join(key))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, key: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        let object_path = self.object_path(key)?;

        let temp_path = self.temp_path();
        let written = async {
            let mut temp_file = fs::File::create(&temp_path).await?;
            let written = tokio::io::copy(&mut reader, &mut temp_file).await?;
            temp_file.flush().await?;
            Ok::<_, std::io::Error>(written)
        }
        .await;
        let written = match written {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        };

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key, size = written, "Stored object");
        Ok(written)
    }

    async fn get_stream(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<BoxReader, StorageError> {
        let object_path = self.object_path(key)?;
        let mut file = match fs::File::open(&object_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let Some(range) = range else {
            return Ok(Box::new(BufReader::new(file)));
        };

        let size = file.metadata().await?.len();
        range.check_within(size)?;
        file.seek(SeekFrom::Start(range.start)).await?;
        Ok(Box::new(BufReader::new(file).take(range.len())))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            let object_path = self.object_path(key)?;
            match fs::remove_file(&object_path).await {
                Ok(()) => debug!(%key, "Deleted object"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let object_path = self.object_path(key)?;
        Ok(fs::try_exists(&object_path).await?)
    }

    async fn size(&self, key: &str) -> Result<u64, StorageError> {
        let object_path = self.object_path(key)?;
        match fs::metadata(&object_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
