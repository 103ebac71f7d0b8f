//! In-memory storage backend.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{Result, TesseraError};
use crate::storage::Storage;

/// A storage backend keeping every blob in memory.
///
/// Used in tests and as a scratch backend for short-lived engines. Blob
/// replacement is trivially atomic under the lock.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<AHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TesseraError::storage(format!("no such blob: {name}")))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.blobs.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn append(&self, name: &str, data: &[u8]) -> Result<()> {
        self.blobs
            .write()
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.read().contains_key(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.blobs.write().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.blobs.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
