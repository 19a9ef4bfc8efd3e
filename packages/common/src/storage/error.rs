use std::fmt;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// No object exists at the requested key.
    NotFound(String),
    /// The key is empty or would escape the store's namespace.
    InvalidKey(String),
    /// The requested byte range does not fit the object.
    InvalidRange { start: u64, end: u64, size: u64 },
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The remote object store rejected or failed the request.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "blob not found: {key}"),
            Self::InvalidKey(msg) => write!(f, "invalid blob key: {msg}"),
            Self::InvalidRange { start, end, size } => {
                write!(f, "byte range {start}-{end} outside blob of {size} bytes")
            }
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::Backend(msg) => write!(f, "object store error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
