//! Object storage access
//!
//! The pipeline reads mapping tables from, and the CLI writes generated
//! scripts to, a path-addressed store. [`LocalStorage`] backs it with the
//! local filesystem.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Path-addressed text storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Read the object at `path` as text
    async fn read(&self, path: &str) -> Result<String, StorageError>;

    /// Write `text` to `path`, replacing any existing object
    async fn write(&self, path: &str, text: &str) -> Result<bool, StorageError>;
}

/// Filesystem-backed storage
///
/// With a root set, absolute storage paths such as `/Volumes/cat/sch/vol/x.csv`
/// resolve beneath it; without one they are used as-is.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    root: Option<PathBuf>,
}

impl LocalStorage {
    pub fn new(root: Option<PathBuf>) -> Self {
        debug!(?root, "LocalStorage::new: called");
        Self { root }
    }

    /// Map a storage path to a filesystem path
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let requested = Path::new(trimmed);
        if requested.components().any(|c| matches!(c, Component::ParentDir)) {
            debug!(%path, "LocalStorage::resolve: parent traversal rejected");
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(match &self.root {
            Some(root) => root.join(requested.strip_prefix("/").unwrap_or(requested)),
            None => requested.to_path_buf(),
        })
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn read(&self, path: &str) -> Result<String, StorageError> {
        debug!(%path, "LocalStorage::read: called");
        let resolved = self.resolve(path)?;
        match tokio::fs::read_to_string(&resolved).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(source) => Err(StorageError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn write(&self, path: &str, text: &str) -> Result<bool, StorageError> {
        debug!(%path, len = text.len(), "LocalStorage::write: called");
        let resolved = self.resolve(path)?;
        let io_err = |source| StorageError::Io {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = resolved.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&resolved, text).await.map_err(io_err)?;
        info!("Wrote {} bytes to {}", text.len(), resolved.display());
        Ok(true)
    }
}
