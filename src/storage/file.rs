//! File-based storage backend.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, TesseraError};
use crate::storage::Storage;

/// A storage backend keeping each blob as a file under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// concurrent reader observes either the old or the new blob, never a torn
/// one.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a file storage rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        // Blob names are flat identifiers; path separators would escape root.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(TesseraError::storage(format!("invalid blob name: {name}")));
        }
        Ok(self.root.join(name))
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(name)?;
        fs::read(&path).map_err(|e| TesseraError::storage(format!("read {name}: {e}")))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(name)?;
        let tmp = self.root.join(format!(".{name}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn append(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(name)?;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.blob_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.blob_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
