//! Storage errors shared by every backend.

use thiserror::Error;

/// Error returned by the storage traits.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend (database driver, connection) failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
