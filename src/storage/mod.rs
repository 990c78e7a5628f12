//! Document and result storage.
//!
//! The pipeline only needs fetch/store over opaque paths; backend identity,
//! naming and credentials stay behind the `FileStore` seam.

pub mod local;

pub use local::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No file at {0}")]
    NotFound(String),

    #[error("Invalid store path: {0}")]
    InvalidPath(String),
}

/// File store abstraction (allows mocking)
pub trait FileStore {
    /// Fetch the bytes stored at `path`.
    fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `bytes` under `folder`, deriving a collision-free name from
    /// `name_hint`. Returns the path the bytes landed at.
    fn store(&self, bytes: &[u8], folder: &str, name_hint: &str) -> Result<String, StorageError>;
}
