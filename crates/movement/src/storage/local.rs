use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use super::{DocumentStorage, DocumentUpload, StorageError, StoredDocument};

const SCHEME: &str = "local://";

/// Filesystem backend addressing documents as `local://<folder>/<file name>`.
#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    root: PathBuf,
}

impl LocalDocumentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || relative.is_empty() {
            return Err(StorageError::InvalidUrl(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait::async_trait]
impl DocumentStorage for LocalDocumentStorage {
    async fn upload(&self, document: DocumentUpload) -> Result<StoredDocument, StorageError> {
        let relative = format!("{}/{}", document.folder.trim_matches('/'), document.file_name);
        let target = self.resolve(&relative)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &document.bytes).await?;
        debug!(path = %target.display(), bytes = document.bytes.len(), "document stored locally");
        Ok(StoredDocument {
            url: format!("{SCHEME}{relative}"),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        let relative = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}
