mod error;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod s3_store;

pub use error::StorageError;
pub use traits::{BlobStore, BoxReader, ByteRange, validate_key};
