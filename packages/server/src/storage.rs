use std::sync::Arc;

use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::memory::MemoryBlobStore;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

/// Build the blob store selected by `storage.backend`.
pub async fn init_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Filesystem => {
            info!(path = %config.filesystem_path.display(), "Using filesystem video storage");
            let store = FilesystemBlobStore::new(config.filesystem_path.clone()).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("Using in-memory video storage");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
        StorageBackend::S3 => init_s3(config),
    }
}

#[cfg(feature = "object-storage")]
fn init_s3(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    use common::storage::s3_store::{S3BlobStore, S3StoreConfig};

    let s3 = config
        .s3
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("storage.backend = \"s3\" requires a [storage.s3] section"))?;
    info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "Using S3 video storage");

    let store = S3BlobStore::create(S3StoreConfig {
        endpoint: s3.endpoint.clone(),
        region: s3.region.clone(),
        bucket: s3.bucket.clone(),
        access_key: s3.access_key.clone(),
        secret_key: s3.secret_key.clone(),
        retries: s3.retries,
    })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "object-storage"))]
fn init_s3(_config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    anyhow::bail!("S3 storage requires the `object-storage` feature")
}
