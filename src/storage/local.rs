use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{FileStore, StorageError};

/// Local filesystem store rooted at one directory.
///
/// Stored files are grouped by date and suffixed for uniqueness, e.g.
/// `results/2026-08-06/case_ab12cd.txt`.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        // Store paths are always relative and never climb out of the root.
        let rel = Path::new(path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl FileStore for LocalFileStore {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(std::fs::read(full)?)
    }

    fn store(&self, bytes: &[u8], folder: &str, name_hint: &str) -> Result<String, StorageError> {
        let folder = folder.trim_matches('/');
        let date = chrono::Utc::now().format("%Y-%m-%d");

        let hint = Path::new(name_hint);
        let stem = hint
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let ext = hint.extension().and_then(|s| s.to_str());
        let unique = Uuid::new_v4().simple().to_string();
        let suffix = &unique[..6];

        let filename = match ext {
            Some(ext) => format!("{stem}_{suffix}.{ext}"),
            None => format!("{stem}_{suffix}"),
        };
        let rel = if folder.is_empty() {
            format!("{date}/{filename}")
        } else {
            format!("{folder}/{date}/{filename}")
        };

        let full = self.resolve(&rel)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes)?;
        Ok(rel)
    }
}
