//! Storage abstraction for persisted state.
//!
//! The index snapshot and the query log are the only persisted state; both go
//! through the [`Storage`] trait so the backing technology stays pluggable.
//! [`MemoryStorage`] backs tests, [`FileStorage`] backs real deployments.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// A named-blob storage backend.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Read the entire contents of a named blob.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Write a blob under the given name, replacing any previous contents.
    /// The replacement must be atomic: readers observe either the old or the
    /// new contents, never a mix.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Append to a named blob, creating it if absent.
    fn append(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Check whether a blob exists.
    fn exists(&self, name: &str) -> bool;

    /// Delete a blob. Deleting a missing blob is not an error.
    fn delete(&self, name: &str) -> Result<()>;

    /// List all blob names in this storage.
    fn list(&self) -> Result<Vec<String>>;
}
