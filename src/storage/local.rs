use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Entry, EntryKind, StorageBackend, WriteMode};
use crate::error::StorageError;

/// Storage rooted at a directory on the local filesystem
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            resolved.push(segment);
        }
        resolved
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| map_io(e, &self.root))?;
        }
        Ok(())
    }
}

fn map_io(err: std::io::Error, path: &Path) -> StorageError {
    let display = path.display().to_string();
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(display),
        ErrorKind::AlreadyExists => StorageError::Conflict(display),
        _ => StorageError::Unavailable(format!("{}: {}", display, err)),
    }
}

impl StorageBackend for LocalBackend {
    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        self.ensure_root()?;
        let target = self.resolve(path);
        fs::create_dir(&target).map_err(|e| map_io(e, &target))
    }

    fn upload(&self, path: &str, contents: &[u8], mode: WriteMode) -> Result<(), StorageError> {
        let target = self.resolve(path);

        match mode {
            WriteMode::Add => {
                let mut file = fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&target)
                    .map_err(|e| map_io(e, &target))?;
                file.write_all(contents).map_err(|e| map_io(e, &target))?;
            }
            WriteMode::Overwrite => {
                // Write beside the target and rename over it so readers never
                // see a half-written file
                let file_name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let tmp = target.with_file_name(format!(".{}.tmp", file_name));
                fs::write(&tmp, contents).map_err(|e| map_io(e, &tmp))?;
                fs::rename(&tmp, &target).map_err(|e| map_io(e, &target))?;
            }
        }

        Ok(())
    }

    fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path);
        if target.is_dir() {
            return Err(StorageError::NotFound(target.display().to_string()));
        }
        fs::read(&target).map_err(|e| map_io(e, &target))
    }

    fn list_folder(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
        let target = self.resolve(path);
        if !target.is_dir() {
            return Err(StorageError::NotFound(target.display().to_string()));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&target)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| StorageError::Unavailable(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();

            // Temporary files from interrupted overwrites
            if name.starts_with('.') {
                continue;
            }

            let kind = if entry.file_type().is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            entries.push(Entry { name, kind });
        }

        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_folder_conflict() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("Projekte"));

        backend.create_folder("/Ostflügel").unwrap();
        assert!(dir.path().join("Projekte/Ostflügel").is_dir());

        let err = backend.create_folder("/Ostflügel").unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_create_folder_missing_parent() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf());

        let err = backend.create_folder("/missing/Fotos").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_upload_modes() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf());
        backend.create_folder("/p").unwrap();

        backend.upload("/p/a.csv", b"one", WriteMode::Add).unwrap();
        let err = backend.upload("/p/a.csv", b"two", WriteMode::Add).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(backend.download("/p/a.csv").unwrap(), b"one");

        backend.upload("/p/a.csv", b"three", WriteMode::Overwrite).unwrap();
        assert_eq!(backend.download("/p/a.csv").unwrap(), b"three");
    }

    #[test]
    fn test_download_missing() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf());

        let err = backend.download("/p/none.csv").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_list_folder() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().to_path_buf());
        backend.create_folder("/p").unwrap();
        backend.create_folder("/p/Fotos").unwrap();
        backend.upload("/p/t.csv", b"x", WriteMode::Overwrite).unwrap();

        let mut entries = backend.list_folder("/p").unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Fotos");
        assert!(entries[0].is_folder());
        assert_eq!(entries[1].name, "t.csv");
        assert!(entries[1].is_file());

        assert!(matches!(
            backend.list_folder("/nope").unwrap_err(),
            StorageError::NotFound(_)
        ));
    }
}
