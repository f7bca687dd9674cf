//! Storage backends.
//!
//! Everything the application persists goes through four operations:
//! create a folder, upload a file, download a file and list a folder.
//! Paths are `/`-separated keys rooted at `/`, the same shape Dropbox
//! uses, so the local filesystem and a Dropbox folder tree are
//! interchangeable.

mod dropbox;
mod local;

pub use dropbox::DropboxBackend;
pub use local::LocalBackend;

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{BackendType, StorageConfig};
use crate::error::StorageError;

/// Collision policy for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `StorageError::Conflict` if the file exists
    Add,
    /// Replace an existing file
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

pub trait StorageBackend: Send + Sync {
    /// Create a single folder; its parent must exist.
    /// Returns `StorageError::Conflict` if something already exists at `path`.
    fn create_folder(&self, path: &str) -> Result<(), StorageError>;

    fn upload(&self, path: &str, contents: &[u8], mode: WriteMode) -> Result<(), StorageError>;

    fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Direct children of a folder, in no particular order
    fn list_folder(&self, path: &str) -> Result<Vec<Entry>, StorageError>;

    fn backend_name(&self) -> &'static str;
}

/// Join a storage key and a child name.
pub fn join_path(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Build the backend selected in the configuration.
pub fn create_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    build_backend(config, config.dropbox.resolve_token())
}

fn build_backend(config: &StorageConfig, token: Option<String>) -> Result<Arc<dyn StorageBackend>> {
    match config.backend {
        BackendType::Local => {
            let backend = LocalBackend::new(config.path.clone());
            info!("Using local storage at {}", backend.root().display());
            Ok(Arc::new(backend))
        }
        BackendType::Dropbox => {
            let Some(token) = token else {
                bail!("Dropbox backend selected but no access token configured (set DROPBOX_ACCESS_TOKEN)");
            };
            Ok(Arc::new(DropboxBackend::new(
                token,
                Duration::from_secs(config.dropbox.timeout_secs),
            )))
        }
    }
}
